//! DispatchExecutor - fixed worker pool behind a bounded queue with
//! caller-runs backpressure.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender, TrySendError};
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use lifecycle::{panic_message, ErrorSink};

use crate::metrics::DispatchMetrics;

/// Boxed unit of downstream work.
pub type DispatchTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Fixed pool of `N` workers consuming a bounded queue of capacity `2N`.
///
/// The queue length can never exceed `2N`, and no task is ever silently
/// dropped except tasks still queued (not yet started) at [`stop`] time -
/// that is the one documented exception.
///
/// [`stop`]: DispatchExecutor::stop
pub struct DispatchExecutor {
    tx: Sender<DispatchTask>,
    rx: Receiver<DispatchTask>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<DispatchMetrics>,
    stopped: AtomicBool,
}

impl DispatchExecutor {
    /// Spawn `parallelism` workers over a queue of capacity `2 * parallelism`.
    ///
    /// Panics escaping a task are routed to `error_sink`; the worker keeps
    /// consuming.
    pub fn new(parallelism: usize, error_sink: Arc<dyn ErrorSink>) -> Self {
        let parallelism = parallelism.max(1);
        let (tx, rx) = async_channel::bounded(parallelism * 2);
        let metrics = Arc::new(DispatchMetrics::new());

        let workers = (0..parallelism)
            .map(|worker_id| {
                let rx = rx.clone();
                let metrics = Arc::clone(&metrics);
                let sink = Arc::clone(&error_sink);
                tokio::spawn(dispatch_worker(worker_id, rx, metrics, sink))
            })
            .collect();

        debug!(
            parallelism,
            queue_capacity = parallelism * 2,
            "dispatch executor started"
        );

        Self {
            tx,
            rx,
            workers: Mutex::new(workers),
            metrics,
            stopped: AtomicBool::new(false),
        }
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Current queue length
    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }

    /// Submit a task for execution.
    ///
    /// Enqueues and returns immediately when the queue has capacity. When the
    /// queue is full the task runs synchronously on the caller before
    /// `submit` returns - backpressure slows the producer instead of growing
    /// memory or rejecting work. A sync-executed task can therefore complete
    /// before tasks still sitting in the queue; tasks on the async path keep
    /// their submission order relative to each other.
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tx.try_send(Box::pin(task)) {
            Ok(()) => {
                self.metrics.inc_queued();
                self.metrics.observe_queue_len(self.tx.len());
            }
            Err(TrySendError::Full(task)) => {
                self.metrics.inc_caller_run();
                task.await;
                self.metrics.inc_completed();
            }
            Err(TrySendError::Closed(_)) => {
                // submitting after stop() is a caller bug; drop loudly
                warn!("dispatch executor is stopped, task discarded");
                self.metrics.add_discarded(1);
            }
        }
    }

    /// Best-effort, non-blocking shutdown. Safe to call more than once.
    ///
    /// Stops accepting new work, interrupts any task currently executing and
    /// discards (does not execute) tasks still sitting in the queue. Returns
    /// without waiting for interrupted tasks to finish.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tx.close();
        for handle in self.workers.lock().unwrap().drain(..) {
            handle.abort();
        }
        let mut discarded = 0u64;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.metrics.add_discarded(discarded);
        }
        debug!(discarded, "dispatch executor stopped");
    }

    /// Whether [`stop`](DispatchExecutor::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for DispatchExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker loop: take from the queue, run, account.
async fn dispatch_worker(
    worker_id: usize,
    rx: Receiver<DispatchTask>,
    metrics: Arc<DispatchMetrics>,
    sink: Arc<dyn ErrorSink>,
) {
    debug!(worker_id, "dispatch worker started");

    while let Ok(task) = rx.recv().await {
        metrics.observe_queue_len(rx.len());

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(()) => metrics.inc_completed(),
            Err(payload) => {
                metrics.inc_failed();
                sink.capture("dispatch-worker", &panic_message(payload));
                // Continue processing - don't take the worker down with the task
            }
        }
    }

    debug!(worker_id, "dispatch worker stopped");
}
