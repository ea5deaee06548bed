//! # Lifecycle
//!
//! Process lifecycle coordination.
//!
//! Responsibilities:
//! - [`LifecycleGate`]: one-shot, idempotent shutdown signal the main task
//!   parks on
//! - [`ErrorSink`]: injectable capture point for failures escaping background
//!   tasks
//!
//! Both are constructed-and-owned values passed to whatever assembles the
//! process, never ambient globals, so tests can set up and tear down multiple
//! instances.

mod error_sink;
mod gate;

pub use error_sink::{panic_message, ErrorSink, RecordingErrorSink, TracingErrorSink};
pub use gate::LifecycleGate;
