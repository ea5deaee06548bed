//! Metrics collection for the dispatch executor and the reconfiguration
//! poller.

use dispatcher::DispatchSnapshot;
use metrics::{counter, gauge, histogram};

/// Export an executor metrics snapshot.
///
/// Intended to be called periodically from a sampler task; counters are set
/// to their absolute cumulative values.
pub fn record_dispatch_metrics(snapshot: &DispatchSnapshot) {
    gauge!("binrelay_dispatch_queue_len").set(snapshot.queue_len as f64);
    gauge!("binrelay_dispatch_queue_len_max").set(snapshot.max_queue_len as f64);
    histogram!("binrelay_dispatch_queue_len_hist").record(snapshot.queue_len as f64);

    counter!("binrelay_dispatch_queued_total").absolute(snapshot.queued_count);
    counter!("binrelay_dispatch_caller_run_total").absolute(snapshot.caller_run_count);
    counter!("binrelay_dispatch_completed_total").absolute(snapshot.completed_count);
    counter!("binrelay_dispatch_failed_total").absolute(snapshot.failed_count);
    counter!("binrelay_dispatch_discarded_total").absolute(snapshot.discarded_count);
}

/// Record one reconfiguration poll tick.
///
/// `outcome` is one of `established`, `unchanged`, `restarted` or `failed`.
pub fn record_poll_tick(outcome: &str) {
    counter!(
        "binrelay_reconfig_ticks_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a completed stop/merge/start cycle.
pub fn record_service_restart() {
    counter!("binrelay_service_restarts_total").increment(1);
}

/// Export the total records the capture engine has delivered downstream.
pub fn record_records_produced(produced: u64) {
    counter!("binrelay_records_produced_total").absolute(produced);
}

/// In-memory aggregation of executor snapshots, for summary output at
/// shutdown.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Snapshots observed
    pub samples: u64,

    /// Queue length statistics across samples
    pub queue_stats: RunningStats,

    /// Latest cumulative snapshot
    last: Option<DispatchSnapshot>,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot into the aggregate.
    pub fn update(&mut self, snapshot: &DispatchSnapshot) {
        self.samples += 1;
        self.queue_stats.push(snapshot.queue_len as f64);
        self.last = Some(*snapshot);
    }

    /// Produce a summary report.
    pub fn summary(&self) -> MetricsSummary {
        let last = self.last.unwrap_or(DispatchSnapshot {
            queue_len: 0,
            max_queue_len: 0,
            queued_count: 0,
            caller_run_count: 0,
            completed_count: 0,
            failed_count: 0,
            discarded_count: 0,
        });
        let submitted = last.queued_count + last.caller_run_count;
        MetricsSummary {
            samples: self.samples,
            completed: last.completed_count,
            failed: last.failed_count,
            discarded: last.discarded_count,
            caller_run: last.caller_run_count,
            max_queue_len: last.max_queue_len,
            caller_run_rate: if submitted > 0 {
                last.caller_run_count as f64 / submitted as f64 * 100.0
            } else {
                0.0
            },
            queue_len: StatsSummary::from(&self.queue_stats),
        }
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub samples: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded: u64,
    pub caller_run: u64,
    pub max_queue_len: usize,
    pub caller_run_rate: f64,
    pub queue_len: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Completed tasks: {}", self.completed)?;
        writeln!(f, "Failed tasks: {}", self.failed)?;
        writeln!(f, "Discarded tasks: {}", self.discarded)?;
        writeln!(
            f,
            "Caller-run tasks: {} ({:.2}% of submissions)",
            self.caller_run, self.caller_run_rate
        )?;
        writeln!(f, "Queue high-water mark: {}", self.max_queue_len)?;
        writeln!(f, "Queue length: {}", self.queue_len)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
