//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ConfigOverlay, LocalConfig};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    server_id: String,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_endpoint: Option<String>,
    override_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(local) => {
            let warnings = collect_warnings(&local);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    server_id: local.server_id.clone(),
                    mode: if local.admin.is_some() {
                        "managed".to_string()
                    } else {
                        "standalone".to_string()
                    },
                    admin_endpoint: local.admin.as_ref().map(|a| a.endpoint.clone()),
                    override_count: override_count(&local.overrides),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(local: &LocalConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match &local.admin {
        None => {
            warnings.push(
                "No [admin] section - running standalone, remote reconfiguration disabled"
                    .to_string(),
            );
            if override_count(&local.overrides) == 0 {
                warnings
                    .push("No overrides set - built-in defaults apply to everything".to_string());
            }
        }
        Some(admin) => {
            if admin.access_key.is_none() || admin.secret_key.is_none() {
                warnings.push(
                    "Admin credentials not set - authority requests will be unauthenticated"
                        .to_string(),
                );
            }
        }
    }

    warnings
}

/// Number of options the overlay actually sets.
fn override_count(overrides: &ConfigOverlay) -> usize {
    match serde_json::to_value(overrides) {
        Ok(serde_json::Value::Object(map)) => map.values().filter(|v| !v.is_null()).count(),
        _ => 0,
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Server ID: {}", summary.server_id);
            println!("  Mode: {}", summary.mode);
            if let Some(ref endpoint) = summary.admin_endpoint {
                println!("  Admin endpoint: {}", endpoint);
            }
            println!("  Overrides: {}", summary.override_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args_for(file: &tempfile::NamedTempFile) -> ValidateArgs {
        ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        }
    }

    #[test]
    fn test_valid_managed_config() {
        let file = write_config(
            r#"
server_id = "agent-1"

[admin]
endpoint = "http://127.0.0.1:8089"
access_key = "ak"
secret_key = "sk"

[overrides]
parallel_thread_size = 4
"#,
        );

        let result = validate_config(&args_for(&file));
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.mode, "managed");
        assert_eq!(summary.override_count, 1);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_standalone_config_warns() {
        let file = write_config(r#"server_id = "agent-1""#);

        let result = validate_config(&args_for(&file));
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().mode, "standalone");
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/binrelay.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        // missing server_id fails validation in the loader
        let file = write_config(r#"server_id = """#);
        let result = validate_config(&args_for(&file));
        assert!(!result.valid);
        assert!(result.error.is_some());
    }
}
