//! Concurrency-paced generator tests

mod common;

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use volley_config::Schedule;
use volley_core::{CallResult, PersistentWorker, StopReason, WorkerContext, WorkloadError, ERR_CALL_TIMEOUT};
use volley_engine::{Engine, EngineConfig};

use common::{MockWorker, SUCCESS_DATA};

/// Lets a test inspect the worker it hands to the engine
struct SharedWorker(Arc<MockWorker>);

#[async_trait::async_trait]
impl PersistentWorker for SharedWorker {
    async fn setup(&self, ctx: &WorkerContext) -> Result<(), WorkloadError> {
        self.0.setup(ctx).await
    }

    async fn run(&self, ctx: WorkerContext) {
        self.0.run(ctx).await
    }

    async fn teardown(&self, ctx: &WorkerContext) -> Result<(), WorkloadError> {
        self.0.teardown(ctx).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_static_workers() -> Result<()> {
    volley_logging::init_test_tracing();
    let worker = Arc::new(MockWorker::new(Duration::from_millis(50)));
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(3))
            .with_persistent(SharedWorker(worker.clone()))
            .with_duration(Duration::from_secs(1)),
    )?;
    let outcome = engine.run().await?;

    assert!(!outcome.failed);
    assert_eq!(outcome.stats.current_concurrency, 3);
    assert_eq!(worker.setups(), 3);
    assert_eq!(worker.teardowns(), 3);
    // three workers, one result every 50ms each
    assert!((57..=60).contains(&outcome.stats.success), "success = {}", outcome.stats.success);
    assert!(outcome.data.ok_data.iter().all(|d| d == &json!(SUCCESS_DATA)));
    assert!(outcome.data.ok_results[0].duration >= Duration::from_millis(50));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_worker_ramp_is_capped() -> Result<()> {
    let worker = Arc::new(MockWorker::new(Duration::from_millis(50)));
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(1).ramp(2, Duration::from_secs(1), 10))
            .with_persistent(SharedWorker(worker.clone()))
            .with_duration(Duration::from_millis(7500)),
    )?;
    let outcome = engine.run().await?;

    assert!(!outcome.failed);
    assert_eq!(outcome.stats.current_concurrency, 10);
    assert_eq!(worker.setups(), 10);
    assert_eq!(worker.teardowns(), 10);
    assert!(outcome.data.ok_results.len() > 50);
    assert!(outcome.data.fail_results.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_setup_failure_is_recorded() -> Result<()> {
    let worker = MockWorker {
        fail_setup: true,
        ..MockWorker::new(Duration::from_millis(50))
    };
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(2))
            .with_persistent(worker)
            .with_duration(Duration::from_secs(1)),
    )?;
    let outcome = engine.run().await?;

    assert!(outcome.failed);
    assert_eq!(outcome.stats.success, 0);
    assert_eq!(outcome.stats.failed, 2);
    assert_eq!(
        engine.errors(),
        vec![
            "generator request setup error: no connection".to_string(),
            "generator request setup error: no connection".to_string(),
        ]
    );
    Ok(())
}

struct SlowSetup;

#[async_trait::async_trait]
impl PersistentWorker for SlowSetup {
    async fn setup(&self, _ctx: &WorkerContext) -> Result<(), WorkloadError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn run(&self, ctx: WorkerContext) {
        ctx.push(CallResult::ok("should not run")).await;
        ctx.cancelled().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_setup_timeout() -> Result<()> {
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(1))
            .with_persistent(SlowSetup)
            .with_setup_timeout(Duration::from_secs(1))
            .with_duration(Duration::from_secs(2)),
    )?;
    let outcome = engine.run().await?;

    assert_eq!(outcome.stats.success, 0);
    assert_eq!(engine.errors(), vec!["generator request setup timeout".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_worker_call_timeouts_trip_threshold() -> Result<()> {
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(2))
            .with_persistent(MockWorker::new(Duration::from_secs(10)))
            .with_call_timeout(Duration::from_millis(200))
            .with_timeout_threshold(4),
    )?;
    let outcome = engine.run().await?;

    assert!(outcome.failed);
    assert_eq!(outcome.stats.stop_reason, Some(StopReason::ThresholdBreached));
    assert!(outcome.stats.timed_out > 4);
    assert!(outcome
        .data
        .fail_results
        .iter()
        .all(|r| r.timeout && r.error.as_deref() == Some(ERR_CALL_TIMEOUT)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paused_workers_idle() -> Result<()> {
    let engine = Engine::new(
        EngineConfig::new(Schedule::concurrency(1))
            .with_persistent(MockWorker::new(Duration::from_millis(100))),
    )?;
    engine.pause();
    engine.start()?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.stats().success, 0);

    engine.resume();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let outcome = engine.stop().await;
    assert!((8..=10).contains(&outcome.stats.success), "success = {}", outcome.stats.success);
    Ok(())
}
