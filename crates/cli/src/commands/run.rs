//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use lifecycle::LifecycleGate;

use crate::agent::AgentRuntime;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_agent(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let local = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        server_id = %local.server_id,
        managed = local.admin.is_some() && !args.standalone,
        "Configuration loaded"
    );

    // Metrics endpoint (optional); logging is already up
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    // Any trigger may release the gate; the sequence runs exactly once
    let gate = LifecycleGate::new();
    spawn_signal_handler(gate.clone());

    let runtime = AgentRuntime::bootstrap(local, args.standalone).await?;
    info!("Agent started, press Ctrl+C to stop");

    runtime.run(gate).await?;

    info!("binrelay finished");
    Ok(())
}

/// Release the gate on Ctrl+C or SIGTERM.
fn spawn_signal_handler(gate: LifecycleGate) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        warn!("Received shutdown signal");
        gate.release();
    });
}
