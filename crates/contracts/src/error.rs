//! Layered error definitions
//!
//! Categorized by source: config / admin authority / service controller

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum AgentError {
    // ===== Configuration Errors =====
    /// Local configuration source missing or unreadable
    #[error("config load error: {message}")]
    ConfigLoad {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Admin Authority Errors =====
    /// The authority has no record of this server. Fatal at startup,
    /// logged and retried when it recurs during polling.
    #[error("server '{server_id}' is not registered with the admin authority")]
    NotRegistered { server_id: String },

    /// The authority is unreachable; the tick ends early and the schedule
    /// continues unaffected.
    #[error("admin authority unavailable: {message}")]
    AdminUnavailable { message: String },

    // ===== Service Controller Errors =====
    /// Capture engine start/stop failure
    #[error("service controller {op} failed: {message}")]
    ServiceController { op: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Create config load error
    pub fn config_load(message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            message: message.into(),
            source: None,
        }
    }

    /// Create config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create config validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create not-registered error
    pub fn not_registered(server_id: impl Into<String>) -> Self {
        Self::NotRegistered {
            server_id: server_id.into(),
        }
    }

    /// Create transient authority-unavailable error
    pub fn admin_unavailable(message: impl Into<String>) -> Self {
        Self::AdminUnavailable {
            message: message.into(),
        }
    }

    /// Create service controller error
    pub fn service_controller(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceController {
            op: op.into(),
            message: message.into(),
        }
    }

    /// Whether the failure is worth retrying on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AdminUnavailable { .. })
    }
}
