//! Agent runtime - wires the executor, capture engine and poller together
//! and drives the ordered shutdown sequence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};

use admin_client::{AdminEndpoint, HttpAdminClient};
use capture::MockCaptureEngine;
use contracts::{merge, AdminConfigClient, LocalConfig, ServiceController};
use dispatcher::DispatchExecutor;
use lifecycle::{ErrorSink, LifecycleGate, TracingErrorSink};
use observability::{record_dispatch_metrics, record_records_produced, DispatchStatsAggregator};
use reconfig::{PollerHandle, ReconfigurationPoller};

use crate::error::CliError;

const METRICS_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// A fully bootstrapped agent: engine running, poller scheduled (when
/// managed by an authority).
pub struct AgentRuntime {
    executor: Arc<DispatchExecutor>,
    engine: Arc<MockCaptureEngine>,
    poller: Option<PollerHandle>,
    stats: Arc<Mutex<DispatchStatsAggregator>>,
}

impl AgentRuntime {
    /// Resolve the startup configuration and bring the agent up.
    ///
    /// With an `[admin]` section the authority is contacted once for the
    /// initial snapshot; an unregistered server or unreachable authority is
    /// fatal here, unlike later poll ticks. Without one the agent runs
    /// standalone from local overrides and no poller is scheduled.
    pub async fn bootstrap(local: LocalConfig, standalone: bool) -> Result<Self, CliError> {
        let admin = if standalone { None } else { local.admin.clone() };

        let (overlay, remote) = match admin {
            Some(settings) => {
                let client = HttpAdminClient::new(AdminEndpoint {
                    endpoint: settings.endpoint.clone(),
                    server_id: local.server_id.clone(),
                    access_key: settings.access_key.clone(),
                    secret_key: settings.secret_key.clone(),
                })?;

                if settings.auto_register {
                    client.register().await?;
                    info!(server_id = %local.server_id, "registered with admin authority");
                }

                let snapshot = client.fetch(None).await?.ok_or_else(|| {
                    CliError::bootstrap("authority returned no snapshot for this server")
                })?;
                info!(version = %snapshot.version, "initial remote config fetched");

                (merge(&snapshot.config, &local.overrides), Some((client, snapshot)))
            }
            None => {
                info!("no admin authority configured, running standalone");
                (local.overrides.clone(), None)
            }
        };

        let cfg = overlay.resolve();
        info!(
            parallel_thread_size = cfg.parallel_thread_size,
            batch_size = cfg.batch_size,
            scan_interval_secs = cfg.scan_interval_secs,
            access_channel = %cfg.access_channel,
            "effective configuration resolved"
        );

        let error_sink: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink);
        let executor = Arc::new(DispatchExecutor::new(
            cfg.parallel_thread_size,
            Arc::clone(&error_sink),
        ));
        let engine = Arc::new(MockCaptureEngine::new(Arc::clone(&executor)));
        engine.start(&cfg).await?;

        let poller = remote.map(|(client, snapshot)| {
            ReconfigurationPoller::new(
                client,
                Arc::clone(&engine),
                local.overrides.clone(),
                cfg.scan_interval(),
            )
            .with_initial_snapshot(snapshot)
            .spawn(error_sink)
        });

        Ok(Self {
            executor,
            engine,
            poller,
            stats: Arc::new(Mutex::new(DispatchStatsAggregator::new())),
        })
    }

    /// Run until the gate is released, then shut down in order: executor
    /// first (stop accepting work), then the poller (no more restarts), then
    /// the engine.
    pub async fn run(mut self, gate: LifecycleGate) -> Result<(), CliError> {
        let sampler = spawn_metrics_sampler(
            Arc::clone(&self.executor),
            Arc::clone(&self.engine),
            Arc::clone(&self.stats),
        );

        gate.wait().await;
        info!("shutdown requested");

        sampler.abort();
        self.executor.stop();
        if let Some(poller) = self.poller.take() {
            poller.cancel().await;
        }
        if let Err(e) = self.engine.stop().await {
            warn!(error = %e, "capture engine stop failed during shutdown");
        }

        // one final sample so the summary reflects the end state
        let final_snapshot = self.executor.metrics().snapshot();
        let mut stats = self.stats.lock().unwrap();
        stats.update(&final_snapshot);
        println!("{}", stats.summary());

        info!("agent stopped");
        Ok(())
    }
}

fn spawn_metrics_sampler(
    executor: Arc<DispatchExecutor>,
    engine: Arc<MockCaptureEngine>,
    stats: Arc<Mutex<DispatchStatsAggregator>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(METRICS_SAMPLE_INTERVAL).await;
            let snapshot = executor.metrics().snapshot();
            record_dispatch_metrics(&snapshot);
            record_records_produced(engine.produced());
            stats.lock().unwrap().update(&snapshot);
        }
    })
}
