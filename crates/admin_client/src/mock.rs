//! Mock admin authority client.
//!
//! Scripted implementation for unit tests; supports failure injection.

use std::sync::{Arc, Mutex};

use contracts::{
    AdminConfigClient, AgentError, ConfigOverlay, ConfigSnapshot, VersionToken,
};

#[derive(Default)]
struct MockState {
    /// Current authority-side snapshot; `None` simulates an unregistered
    /// server.
    snapshot: Option<ConfigSnapshot>,
    /// One-shot injected failure consumed by the next fetch.
    fail_next: Option<AgentError>,
    fetch_count: u64,
}

/// Mock authority client
#[derive(Clone, Default)]
pub struct MockAdminClient {
    inner: Arc<Mutex<MockState>>,
}

impl MockAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authority-side config and version, as if an operator pushed a
    /// new revision.
    pub fn set_snapshot(&self, config: ConfigOverlay, version: impl Into<String>) {
        self.inner.lock().unwrap().snapshot =
            Some(ConfigSnapshot::new(config, VersionToken::new(version)));
    }

    /// Forget this server, so subsequent unconditional fetches fail with
    /// `NotRegistered`.
    pub fn clear_snapshot(&self) {
        self.inner.lock().unwrap().snapshot = None;
    }

    /// Inject a failure consumed by the next fetch only.
    pub fn fail_next(&self, error: AgentError) {
        self.inner.lock().unwrap().fail_next = Some(error);
    }

    /// Total fetches observed.
    pub fn fetch_count(&self) -> u64 {
        self.inner.lock().unwrap().fetch_count
    }
}

impl AdminConfigClient for MockAdminClient {
    async fn fetch(
        &self,
        since: Option<&VersionToken>,
    ) -> Result<Option<ConfigSnapshot>, AgentError> {
        let mut state = self.inner.lock().unwrap();
        state.fetch_count += 1;

        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        match (&state.snapshot, since) {
            (None, _) => Err(AgentError::not_registered("mock-server")),
            (Some(snapshot), None) => Ok(Some(snapshot.clone())),
            (Some(snapshot), Some(token)) => {
                if snapshot.version == *token {
                    Ok(None)
                } else {
                    Ok(Some(snapshot.clone()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> ConfigOverlay {
        ConfigOverlay {
            batch_size: Some(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unregistered_server() {
        let client = MockAdminClient::new();
        let err = client.fetch(None).await.unwrap_err();
        assert!(matches!(err, AgentError::NotRegistered { .. }));
    }

    #[tokio::test]
    async fn test_unconditional_fetch_returns_current() {
        let client = MockAdminClient::new();
        client.set_snapshot(overlay(), "v1");
        let snapshot = client.fetch(None).await.unwrap().unwrap();
        assert_eq!(snapshot.version.as_str(), "v1");
    }

    #[tokio::test]
    async fn test_conditional_fetch_none_when_unchanged() {
        let client = MockAdminClient::new();
        client.set_snapshot(overlay(), "v1");
        let token = VersionToken::new("v1");
        assert!(client.fetch(Some(&token)).await.unwrap().is_none());

        client.set_snapshot(overlay(), "v2");
        let snapshot = client.fetch(Some(&token)).await.unwrap().unwrap();
        assert_eq!(snapshot.version.as_str(), "v2");
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let client = MockAdminClient::new();
        client.set_snapshot(overlay(), "v1");
        client.fail_next(AgentError::admin_unavailable("down"));

        assert!(client.fetch(None).await.is_err());
        assert!(client.fetch(None).await.is_ok());
        assert_eq!(client.fetch_count(), 2);
    }
}
