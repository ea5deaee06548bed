//! Capture engine lifecycle abstraction

use std::future::Future;

use crate::config::AgentConfig;
use crate::error::AgentError;

/// Lifecycle state of the capture engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

/// Start/stop surface of the actual capture engine.
///
/// After initial startup only the reconfiguration poller drives these calls,
/// so implementations never see concurrent start/stop.
pub trait ServiceController: Send + Sync {
    /// Start the engine with a fully resolved config.
    ///
    /// Not re-entrant: starting while already running is a programming error
    /// and fails; callers must `stop()` first.
    fn start(&self, cfg: &AgentConfig) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// Stop the engine, fully releasing all resources before returning so
    /// that a subsequent `start` is safe.
    fn stop(&self) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// Current lifecycle state.
    fn state(&self) -> ServiceState;
}
