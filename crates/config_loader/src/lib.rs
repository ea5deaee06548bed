//! # Config Loader
//!
//! Local configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a [`LocalConfig`] with local option overrides
//!
//! A missing or unreadable file is a fatal startup condition for the process;
//! this crate only reports it as [`contracts::AgentError::ConfigLoad`].
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let local = ConfigLoader::load_from_path(Path::new("binrelay.toml")).unwrap();
//! println!("Server: {}", local.server_id);
//! ```

mod parser;
mod validator;

pub use contracts::LocalConfig;
pub use parser::ConfigFormat;

use contracts::AgentError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<LocalConfig, AgentError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<LocalConfig, AgentError> {
        let local = parser::parse(content, format)?;
        validator::validate(&local)?;
        Ok(local)
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, AgentError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| AgentError::config_load("cannot determine file format from extension"))?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| AgentError::config_load(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, AgentError> {
        std::fs::read_to_string(path).map_err(|e| AgentError::ConfigLoad {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })
    }
}
