//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// binrelay - managed change-capture agent with live reconfiguration
#[derive(Parser, Debug)]
#[command(
    name = "binrelay",
    author,
    version,
    about = "Change-capture agent with live remote reconfiguration",
    long_about = "A change-capture agent managed by a remote admin authority.\n\n\
                  Fetches its effective configuration by merging the authority's \n\
                  snapshot with local overrides, dispatches captured records through \n\
                  a bounded worker pool, and hot-restarts the capture engine when \n\
                  the remote configuration drifts."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BINRELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BINRELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the capture agent
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "binrelay.toml", env = "BINRELAY_CONFIG")]
    pub config: PathBuf,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "BINRELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Ignore the [admin] section and run from local overrides only
    #[arg(long)]
    pub standalone: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "binrelay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
