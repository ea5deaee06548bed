//! # Integration Tests
//!
//! End-to-end tests wiring the real components together:
//! admin client -> poller -> capture engine -> dispatch executor.
//!
//! Covers:
//! - hot restart with merged config on remote drift
//! - authority outage tolerance
//! - ordered shutdown
//! - local file to effective config pipeline

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::time::Duration;

    use capture::MockCaptureEngine;
    use dispatcher::DispatchExecutor;
    use lifecycle::{ErrorSink, TracingErrorSink};

    pub fn error_sink() -> Arc<dyn ErrorSink> {
        Arc::new(TracingErrorSink)
    }

    pub fn engine_with_executor(parallelism: usize) -> (Arc<MockCaptureEngine>, Arc<DispatchExecutor>) {
        let executor = Arc::new(DispatchExecutor::new(parallelism, error_sink()));
        let engine = Arc::new(MockCaptureEngine::new(Arc::clone(&executor)));
        (engine, executor)
    }

    pub async fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        done()
    }
}

#[cfg(test)]
mod e2e_reconfiguration {
    use std::sync::Arc;
    use std::time::Duration;

    use admin_client::MockAdminClient;
    use contracts::{merge, AdminConfigClient, AgentError, ConfigOverlay, ServiceController, ServiceState};
    use reconfig::{ReconfigurationPoller, TickOutcome};

    use crate::support::{engine_with_executor, error_sink, wait_for};

    fn remote_overlay(batch_size: usize) -> ConfigOverlay {
        ConfigOverlay {
            batch_size: Some(batch_size),
            fetch_timeout_ms: Some(10),
            ..Default::default()
        }
    }

    fn local_overrides() -> ConfigOverlay {
        ConfigOverlay {
            parallel_thread_size: Some(2),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_remote_change_hot_restarts_with_merged_config() {
        let client = MockAdminClient::new();
        client.set_snapshot(remote_overlay(3), "v1");

        let (engine, executor) = engine_with_executor(2);
        let local = local_overrides();

        // bootstrap: unconditional fetch, merge, start
        let snapshot = client.fetch(None).await.unwrap().unwrap();
        let cfg = merge(&snapshot.config, &local).resolve();
        engine.start(&cfg).await.unwrap();

        let poller = ReconfigurationPoller::new(
            client.clone(),
            Arc::clone(&engine),
            local,
            Duration::from_millis(30),
        )
        .with_initial_snapshot(snapshot)
        .spawn(error_sink());

        assert!(
            wait_for(Duration::from_secs(2), || engine.produced() > 0).await,
            "records should flow after bootstrap"
        );

        // operator pushes a new revision
        client.set_snapshot(remote_overlay(9), "v2");

        assert!(
            wait_for(Duration::from_secs(2), || {
                engine.last_config().is_some_and(|c| c.batch_size == 9)
            })
            .await,
            "engine should restart with the new remote batch size"
        );

        let applied = engine.last_config().unwrap();
        assert_eq!(applied.parallel_thread_size, 2, "local override must survive the restart");
        assert_eq!(engine.state(), ServiceState::Running);

        poller.cancel().await;
        engine.stop().await.unwrap();
        executor.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unchanged_version_is_a_no_op() {
        let client = MockAdminClient::new();
        client.set_snapshot(remote_overlay(3), "v1");

        let (engine, executor) = engine_with_executor(1);
        let snapshot = client.fetch(None).await.unwrap().unwrap();
        let cfg = merge(&snapshot.config, &ConfigOverlay::default()).resolve();
        engine.start(&cfg).await.unwrap();

        let mut poller = ReconfigurationPoller::new(
            client.clone(),
            Arc::clone(&engine),
            ConfigOverlay::default(),
            Duration::from_millis(30),
        )
        .with_initial_snapshot(snapshot);

        for _ in 0..3 {
            assert_eq!(poller.poll_once().await.unwrap(), TickOutcome::Unchanged);
        }
        assert_eq!(engine.last_config().unwrap().batch_size, 3);
        assert_eq!(engine.state(), ServiceState::Running);

        engine.stop().await.unwrap();
        executor.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_authority_outage_does_not_kill_the_schedule() {
        let client = MockAdminClient::new();
        client.set_snapshot(remote_overlay(3), "v1");

        let (engine, executor) = engine_with_executor(1);
        let snapshot = client.fetch(None).await.unwrap().unwrap();
        let cfg = snapshot.config.resolve();
        engine.start(&cfg).await.unwrap();

        let poller = ReconfigurationPoller::new(
            client.clone(),
            Arc::clone(&engine),
            ConfigOverlay::default(),
            Duration::from_millis(30),
        )
        .with_initial_snapshot(snapshot)
        .spawn(error_sink());

        // one failing tick, then a new revision behind it
        client.fail_next(AgentError::admin_unavailable("502 from authority"));
        client.set_snapshot(remote_overlay(7), "v2");

        assert!(
            wait_for(Duration::from_secs(2), || {
                engine.last_config().is_some_and(|c| c.batch_size == 7)
            })
            .await,
            "poller should recover after a transient authority failure"
        );

        poller.cancel().await;
        engine.stop().await.unwrap();
        executor.stop();
    }
}

#[cfg(test)]
mod shutdown_sequence {
    use std::sync::Arc;
    use std::time::Duration;

    use admin_client::MockAdminClient;
    use contracts::{AdminConfigClient, ConfigOverlay, ServiceController, ServiceState};
    use lifecycle::LifecycleGate;
    use reconfig::ReconfigurationPoller;

    use crate::support::{engine_with_executor, error_sink, wait_for};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ordered_shutdown_executor_poller_engine() {
        let client = MockAdminClient::new();
        client.set_snapshot(
            ConfigOverlay {
                fetch_timeout_ms: Some(10),
                batch_size: Some(2),
                ..Default::default()
            },
            "v1",
        );

        let (engine, executor) = engine_with_executor(2);
        let snapshot = client.fetch(None).await.unwrap().unwrap();
        engine.start(&snapshot.config.resolve()).await.unwrap();

        let poller = ReconfigurationPoller::new(
            client.clone(),
            Arc::clone(&engine),
            ConfigOverlay::default(),
            Duration::from_millis(30),
        )
        .with_initial_snapshot(snapshot)
        .spawn(error_sink());

        assert!(wait_for(Duration::from_secs(2), || engine.produced() > 0).await);

        // executor first, then poller, then engine
        executor.stop();
        poller.cancel().await;
        engine.stop().await.unwrap();

        assert!(executor.is_stopped());
        assert_eq!(engine.state(), ServiceState::Stopped);

        // nothing keeps polling or producing afterwards
        let fetches = client.fetch_count();
        let produced = engine.produced();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(client.fetch_count(), fetches);
        assert_eq!(engine.produced(), produced);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_gate_drives_shutdown_exactly_once() {
        let gate = LifecycleGate::new();
        let transitions = Arc::new(std::sync::atomic::AtomicU32::new(0));

        // several triggers race to release; only one wins the transition
        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = gate.clone();
            let transitions = Arc::clone(&transitions);
            handles.push(tokio::spawn(async move {
                if gate.release() {
                    transitions.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(transitions.load(std::sync::atomic::Ordering::SeqCst), 1);
        // waiters parked on the gate must observe the release
        tokio::time::timeout(Duration::from_millis(100), gate.wait())
            .await
            .expect("gate.wait must return after release");
    }
}

#[cfg(test)]
mod config_pipeline {
    use std::collections::HashMap;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{merge, ConfigOverlay};

    const LOCAL_TOML: &str = r#"
server_id = "agent-1"

[admin]
endpoint = "http://127.0.0.1:8089"

[overrides]
parallel_thread_size = 4
"#;

    #[test]
    fn test_file_and_wire_map_to_effective_config() {
        let local = ConfigLoader::load_from_str(LOCAL_TOML, ConfigFormat::Toml).unwrap();

        // authority payload as it comes off the wire
        let wire: HashMap<String, String> = [
            ("batchSize", "50"),
            ("parallelThreadSize", "8"),
            ("flatMessage", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let remote = ConfigOverlay::from_key_map(&wire).unwrap();

        let cfg = merge(&remote, &local.overrides).resolve();
        assert_eq!(cfg.parallel_thread_size, 4, "local override wins");
        assert_eq!(cfg.batch_size, 50, "remote option passes through");
        assert_eq!(cfg.dispatch_queue_capacity(), 8);
        assert_eq!(cfg.scan_interval_secs, 5, "default fills the gap");
    }
}

#[cfg(test)]
mod dispatch_observability {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use dispatcher::DispatchExecutor;
    use observability::DispatchStatsAggregator;

    use crate::support::{error_sink, wait_for};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_snapshot_feeds_the_aggregator() {
        let executor = DispatchExecutor::new(2, error_sink());
        let completed = Arc::new(AtomicU64::new(0));

        for _ in 0..5 {
            let completed = Arc::clone(&completed);
            executor
                .submit(async move {
                    completed.fetch_add(1, Ordering::Relaxed);
                })
                .await;
        }
        assert!(
            wait_for(Duration::from_secs(2), || {
                completed.load(Ordering::Relaxed) == 5
            })
            .await
        );

        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.update(&executor.metrics().snapshot());

        let summary = aggregator.summary();
        assert_eq!(summary.completed, 5);
        assert_eq!(summary.discarded, 0);
        assert!(format!("{summary}").contains("Completed tasks: 5"));
    }
}
