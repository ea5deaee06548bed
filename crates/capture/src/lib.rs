//! # Capture
//!
//! Stand-in capture engine behind the [`contracts::ServiceController`]
//! lifecycle surface.
//!
//! [`MockCaptureEngine`] produces synthetic change records at the pace the
//! resolved config dictates and hands each one to the shared
//! [`dispatcher::DispatchExecutor`]. It exists so the control plane (poller,
//! executor, shutdown path) can be exercised end to end without a real
//! upstream source; swapping in a real engine means implementing the same
//! trait.

mod engine;
mod record;

pub use engine::MockCaptureEngine;
pub use record::{batch_records, CaptureRecord, RecordKind};
