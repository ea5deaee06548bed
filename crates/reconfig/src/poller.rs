//! ReconfigurationPoller - fixed-delay config drift detection and hot restart.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    merge, AdminConfigClient, AgentError, ConfigOverlay, ConfigSnapshot, ServiceController,
    VersionToken,
};
use lifecycle::{panic_message, ErrorSink};
use observability::{record_poll_tick, record_service_restart};

/// Outcome of a single poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// First tick: snapshot stored, service untouched.
    Established,
    /// Authority version matches the held token.
    Unchanged,
    /// Drift detected, service restarted with the merged config.
    Restarted,
}

impl TickOutcome {
    /// Stable label for the tick counter metric.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Established => "established",
            Self::Unchanged => "unchanged",
            Self::Restarted => "restarted",
        }
    }
}

/// Polls the admin authority at a fixed delay and hot-restarts the service
/// controller when the remote version token changes.
///
/// All mutable state (the last seen snapshot) is owned by the poll loop
/// itself and written only from it - nothing here is shared or locked. Ticks
/// are totally ordered: the next delay is armed only after the previous tick
/// has fully returned, so ticks can never overlap.
pub struct ReconfigurationPoller<A, S> {
    client: A,
    controller: Arc<S>,
    local_overrides: ConfigOverlay,
    interval: Duration,
    last_snapshot: Option<ConfigSnapshot>,
}

impl<A, S> ReconfigurationPoller<A, S>
where
    A: AdminConfigClient + 'static,
    S: ServiceController + 'static,
{
    pub fn new(
        client: A,
        controller: Arc<S>,
        local_overrides: ConfigOverlay,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            controller,
            local_overrides,
            interval,
            last_snapshot: None,
        }
    }

    /// Seed the snapshot fetched at startup so the first scheduled tick
    /// begins in change-detection mode instead of re-establishing it.
    pub fn with_initial_snapshot(mut self, snapshot: ConfigSnapshot) -> Self {
        self.last_snapshot = Some(snapshot);
        self
    }

    /// Version token of the last snapshot applied or established.
    pub fn last_version(&self) -> Option<&VersionToken> {
        self.last_snapshot.as_ref().map(|s| &s.version)
    }

    /// Run a single tick.
    ///
    /// Failures are returned to the caller; the scheduled loop logs and
    /// swallows them, so one failing tick never cancels the schedule. On a
    /// detected change the sequence is strictly stop, merge, start. A stop
    /// failure is logged and the restart still proceeds with the new config;
    /// a start failure leaves the service stopped and keeps the old token, so
    /// the change is seen (and the start retried) on the next tick.
    #[instrument(name = "reconfig_tick", skip(self), fields(last = self.last_version().map(VersionToken::as_str)))]
    pub async fn poll_once(&mut self) -> Result<TickOutcome, AgentError> {
        let Some(last) = &self.last_snapshot else {
            // initial snapshot establishment only - no restart on this tick
            match self.client.fetch(None).await? {
                Some(snapshot) => {
                    debug!(version = %snapshot.version, "initial config snapshot established");
                    self.last_snapshot = Some(snapshot);
                    return Ok(TickOutcome::Established);
                }
                None => {
                    warn!("authority returned no snapshot for unconditional fetch");
                    return Ok(TickOutcome::Unchanged);
                }
            }
        };

        let Some(snapshot) = self.client.fetch(Some(&last.version)).await? else {
            return Ok(TickOutcome::Unchanged);
        };

        info!(
            old = %last.version,
            new = %snapshot.version,
            "remote config changed, restarting service"
        );

        if let Err(e) = self.controller.stop().await {
            warn!(error = %e, "service stop failed, proceeding with restart");
        }

        let merged = merge(&snapshot.config, &self.local_overrides).resolve();
        self.controller.start(&merged).await?;
        self.last_snapshot = Some(snapshot);
        Ok(TickOutcome::Restarted)
    }

    /// Spawn the fixed-delay poll loop.
    ///
    /// Cancellation is cooperative, checked between ticks: an in-progress
    /// tick always finishes before the loop observes the request. A panic
    /// escaping a tick is reported to `error_sink` and permanently stops the
    /// loop - reconfiguration is then halted until process restart.
    pub fn spawn(self, error_sink: Arc<dyn ErrorSink>) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(run_loop(self, shutdown_rx, error_sink));
        PollerHandle { shutdown_tx, join }
    }
}

/// Handle to a running poll loop.
///
/// Dropping the handle also cancels the loop, but without waiting for an
/// in-progress tick the way [`cancel`](PollerHandle::cancel) does.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Request cancellation and wait for any in-progress tick to finish.
    pub async fn cancel(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

async fn run_loop<A, S>(
    mut poller: ReconfigurationPoller<A, S>,
    mut shutdown: watch::Receiver<bool>,
    error_sink: Arc<dyn ErrorSink>,
) where
    A: AdminConfigClient + 'static,
    S: ServiceController + 'static,
{
    info!(
        interval_secs = poller.interval.as_secs_f64(),
        "reconfiguration poller started"
    );

    loop {
        // fixed delay: armed only after the previous tick fully returned
        tokio::select! {
            changed = shutdown.changed() => {
                // a dropped handle closes the channel; treat it as cancellation
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(poller.interval) => {}
        }
        if *shutdown.borrow() {
            break;
        }

        match AssertUnwindSafe(poller.poll_once()).catch_unwind().await {
            Ok(Ok(outcome)) => {
                record_poll_tick(outcome.as_label());
                if outcome == TickOutcome::Restarted {
                    record_service_restart();
                }
                debug!(?outcome, "tick finished");
            }
            Ok(Err(e)) => {
                record_poll_tick("failed");
                warn!(error = %e, "reconfiguration tick failed");
            }
            Err(payload) => {
                error_sink.capture("reconfiguration-poller", &panic_message(payload));
                error!("poll loop halted, reconfiguration disabled until restart");
                break;
            }
        }
    }

    info!("reconfiguration poller stopped");
}
