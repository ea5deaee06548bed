//! MockCaptureEngine - synthetic change-record producer behind the
//! [`ServiceController`] lifecycle surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use contracts::{AgentConfig, AgentError, ServiceController, ServiceState};
use dispatcher::DispatchExecutor;

use crate::record::batch_records;

/// Synthetic capture engine.
///
/// `start` spawns a producer task that emits one transaction batch every
/// `fetch_timeout_ms`, pushing each record through the shared executor.
/// `stop` signals the producer and waits for it to exit, so a follow-up
/// `start` never races a stale producer.
pub struct MockCaptureEngine {
    executor: Arc<DispatchExecutor>,
    inner: Mutex<EngineInner>,
    produced: Arc<AtomicU64>,
}

#[derive(Default)]
struct EngineInner {
    producer: Option<ProducerHandle>,
    last_config: Option<AgentConfig>,
}

struct ProducerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MockCaptureEngine {
    pub fn new(executor: Arc<DispatchExecutor>) -> Self {
        Self {
            executor,
            inner: Mutex::new(EngineInner::default()),
            produced: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records delivered downstream so far (across restarts).
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    /// Config the engine was most recently started with.
    pub fn last_config(&self) -> Option<AgentConfig> {
        self.inner.lock().unwrap().last_config.clone()
    }
}

impl ServiceController for MockCaptureEngine {
    async fn start(&self, cfg: &AgentConfig) -> Result<(), AgentError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.producer.is_some() {
            return Err(AgentError::service_controller(
                "start",
                "engine is already running",
            ));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(produce_loop(
            cfg.clone(),
            Arc::clone(&self.executor),
            Arc::clone(&self.produced),
            stop_rx,
        ));

        info!(
            batch_size = cfg.batch_size,
            fetch_timeout_ms = cfg.fetch_timeout_ms,
            flat_message = cfg.flat_message,
            filter_transaction_entry = cfg.filter_transaction_entry,
            "capture engine started"
        );
        inner.producer = Some(ProducerHandle { stop_tx, join });
        inner.last_config = Some(cfg.clone());
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        let handle = self.inner.lock().unwrap().producer.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        let _ = handle.stop_tx.send(true);
        handle
            .join
            .await
            .map_err(|e| AgentError::service_controller("stop", e.to_string()))?;
        info!("capture engine stopped");
        Ok(())
    }

    fn state(&self) -> ServiceState {
        if self.inner.lock().unwrap().producer.is_some() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        }
    }
}

/// Producer task: one batch per pace interval until signalled.
async fn produce_loop(
    cfg: AgentConfig,
    executor: Arc<DispatchExecutor>,
    produced: Arc<AtomicU64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let pace = Duration::from_millis(cfg.fetch_timeout_ms);
    let mut sequence = 1u64;

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = sleep(pace) => {
                let batch = batch_records(sequence, &cfg);
                sequence += batch.len() as u64;
                for record in batch {
                    let produced = Arc::clone(&produced);
                    let flat = cfg.flat_message;
                    executor
                        .submit(async move {
                            let _payload = record.encode(flat);
                            produced.fetch_add(1, Ordering::Relaxed);
                        })
                        .await;
                }
            }
        }
    }

    debug!(last_sequence = sequence - 1, "producer loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ConfigOverlay;
    use lifecycle::{ErrorSink, TracingErrorSink};

    fn fast_cfg(batch_size: usize) -> AgentConfig {
        ConfigOverlay {
            batch_size: Some(batch_size),
            fetch_timeout_ms: Some(10),
            ..Default::default()
        }
        .resolve()
    }

    fn engine() -> MockCaptureEngine {
        let sink: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink);
        MockCaptureEngine::new(Arc::new(DispatchExecutor::new(2, sink)))
    }

    async fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        done()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_produces_and_stop_halts() {
        let engine = engine();
        engine.start(&fast_cfg(2)).await.unwrap();
        assert_eq!(engine.state(), ServiceState::Running);

        assert!(
            wait_for(Duration::from_secs(2), || engine.produced() > 0).await,
            "records should flow after start"
        );

        engine.stop().await.unwrap();
        assert_eq!(engine.state(), ServiceState::Stopped);

        // let in-flight submissions drain, then production must be flat
        sleep(Duration::from_millis(100)).await;
        let settled = engine.produced();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.produced(), settled);
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let engine = engine();
        engine.start(&fast_cfg(1)).await.unwrap();
        let err = engine.start(&fast_cfg(1)).await.unwrap_err();
        assert!(matches!(err, AgentError::ServiceController { .. }));
        engine.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_a_no_op() {
        let engine = engine();
        engine.stop().await.unwrap();
        assert_eq!(engine.state(), ServiceState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_applies_new_config() {
        let engine = engine();
        engine.start(&fast_cfg(2)).await.unwrap();
        engine.stop().await.unwrap();

        engine.start(&fast_cfg(7)).await.unwrap();
        assert_eq!(engine.last_config().unwrap().batch_size, 7);
        engine.stop().await.unwrap();
    }
}
