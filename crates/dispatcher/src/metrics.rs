//! Executor metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a dispatch executor
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// High-water mark of the queue length
    max_queue_len: AtomicUsize,
    /// Tasks accepted onto the queue
    queued_count: AtomicU64,
    /// Tasks executed synchronously on the submitter (queue full)
    caller_run_count: AtomicU64,
    /// Tasks that ran to completion
    completed_count: AtomicU64,
    /// Tasks whose execution panicked
    failed_count: AtomicU64,
    /// Tasks discarded while still queued at stop()
    discarded_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the observed queue length, tracking the high-water mark
    pub fn observe_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        self.max_queue_len.fetch_max(len, Ordering::Relaxed);
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn max_queue_len(&self) -> usize {
        self.max_queue_len.load(Ordering::Relaxed)
    }

    pub fn inc_queued(&self) {
        self.queued_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queued_count(&self) -> u64 {
        self.queued_count.load(Ordering::Relaxed)
    }

    pub fn inc_caller_run(&self) {
        self.caller_run_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn caller_run_count(&self) -> u64 {
        self.caller_run_count.load(Ordering::Relaxed)
    }

    pub fn inc_completed(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn add_discarded(&self, n: u64) {
        self.discarded_count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn discarded_count(&self) -> u64 {
        self.discarded_count.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            queue_len: self.queue_len(),
            max_queue_len: self.max_queue_len(),
            queued_count: self.queued_count(),
            caller_run_count: self.caller_run_count(),
            completed_count: self.completed_count(),
            failed_count: self.failed_count(),
            discarded_count: self.discarded_count(),
        }
    }
}

/// Snapshot of executor metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct DispatchSnapshot {
    pub queue_len: usize,
    pub max_queue_len: usize,
    pub queued_count: u64,
    pub caller_run_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub discarded_count: u64,
}
