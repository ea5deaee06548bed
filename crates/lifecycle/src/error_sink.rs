//! ErrorSink - injectable capture point for uncaught background failures

use std::any::Any;
use std::sync::Mutex;

use tracing::error;

/// Process-wide handler for failures that escape a background task.
///
/// Capturing a failure isolates the failing task; the rest of the process
/// keeps running. Injectable so tests can assert on captured failures without
/// process-wide side effects.
pub trait ErrorSink: Send + Sync {
    /// Record a failure from `origin` (a short task label).
    fn capture(&self, origin: &str, detail: &str);
}

/// Production sink: logs through tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn capture(&self, origin: &str, detail: &str) {
        error!(origin, detail, "uncaught failure in background task");
    }
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    captured: Mutex<Vec<(String, String)>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> Vec<(String, String)> {
        self.captured.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for RecordingErrorSink {
    fn capture(&self, origin: &str, detail: &str) {
        self.captured
            .lock()
            .unwrap()
            .push((origin.to_string(), detail.to_string()));
    }
}

/// Extract a printable message from a panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
