//! # Dispatcher
//!
//! Bounded fan-out of produced records to a fixed worker pool.
//!
//! Responsibilities:
//! - consume submitted [`DispatchTask`]s through a bounded queue
//! - absorb downstream saturation by running overflow tasks on the submitting
//!   task instead of growing memory or dropping work
//! - isolate task panics so one bad record cannot take a worker down

pub mod executor;
pub mod metrics;

pub use executor::{DispatchExecutor, DispatchTask};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
