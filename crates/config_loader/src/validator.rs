//! Configuration validation.
//!
//! Rules:
//! - server_id non-empty
//! - admin endpoint non-empty when an admin block is present
//! - integer overrides strictly positive

use contracts::{AgentError, ConfigOverlay, LocalConfig};

/// Validate a [`LocalConfig`].
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(local: &LocalConfig) -> Result<(), AgentError> {
    validate_server_id(local)?;
    validate_admin(local)?;
    validate_overrides(&local.overrides)?;
    Ok(())
}

fn validate_server_id(local: &LocalConfig) -> Result<(), AgentError> {
    if local.server_id.is_empty() {
        return Err(AgentError::config_validation(
            "server_id",
            "server_id cannot be empty",
        ));
    }
    Ok(())
}

fn validate_admin(local: &LocalConfig) -> Result<(), AgentError> {
    if let Some(admin) = &local.admin {
        if admin.endpoint.is_empty() {
            return Err(AgentError::config_validation(
                "admin.endpoint",
                "endpoint cannot be empty when an admin authority is configured",
            ));
        }
    }
    Ok(())
}

fn validate_overrides(overrides: &ConfigOverlay) -> Result<(), AgentError> {
    fn positive<T: PartialOrd + Default + std::fmt::Display + Copy>(
        field: &str,
        value: Option<T>,
    ) -> Result<(), AgentError> {
        if let Some(v) = value {
            if v <= T::default() {
                return Err(AgentError::config_validation(
                    format!("overrides.{field}"),
                    format!("must be > 0, got {v}"),
                ));
            }
        }
        Ok(())
    }

    positive("parallel_thread_size", overrides.parallel_thread_size)?;
    positive("batch_size", overrides.batch_size)?;
    positive("fetch_timeout_ms", overrides.fetch_timeout_ms)?;
    positive("scan_interval_secs", overrides.scan_interval_secs)?;
    Ok(())
}
