//! LifecycleGate - one-shot idempotent shutdown signal

use tokio::sync::watch;

/// One-shot signal keeping the process alive until shutdown is requested.
///
/// Cloneable; any clone may release. Releasing an already-released gate is a
/// no-op, not an error.
#[derive(Debug, Clone)]
pub struct LifecycleGate {
    tx: watch::Sender<bool>,
}

impl LifecycleGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Request shutdown.
    ///
    /// Returns `true` only for the call that performed the transition, so the
    /// shutdown sequence can be driven exactly once no matter how many
    /// triggers fire.
    pub fn release(&self) -> bool {
        self.tx.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    /// Whether the gate has been released.
    pub fn is_released(&self) -> bool {
        *self.tx.borrow()
    }

    /// Park until the gate is released. Returns immediately if it already
    /// was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            // self holds a sender, so changed() cannot fail while we exist
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let gate = LifecycleGate::new();
        assert!(gate.release());
        assert!(!gate.release());
        assert!(!gate.release());
        assert!(gate.is_released());
    }

    #[tokio::test]
    async fn test_wait_returns_after_release() {
        let gate = LifecycleGate::new();
        let waiter = gate.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        gate.release();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_on_already_released_gate() {
        let gate = LifecycleGate::new();
        gate.release();
        // must not hang
        tokio::time::timeout(Duration::from_millis(100), gate.wait())
            .await
            .expect("wait should return immediately");
    }

    #[tokio::test]
    async fn test_double_release_drives_sequence_once() {
        let gate = LifecycleGate::new();
        let mut shutdown_runs = 0;
        for _ in 0..2 {
            if gate.release() {
                shutdown_runs += 1;
            }
        }
        assert_eq!(shutdown_runs, 1);
    }
}
