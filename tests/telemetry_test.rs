//! Telemetry streaming to a sink

mod common;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use volley_config::Schedule;
use volley_core::StatsSnapshot;
use volley_engine::{Engine, EngineConfig};
use volley_output::InMemorySink;

use common::MockGun;

#[tokio::test(start_paused = true)]
async fn test_responses_and_stats_are_streamed() -> Result<()> {
    volley_logging::init_test_tracing();
    let sink = Arc::new(InMemorySink::new());
    let engine = Engine::new(
        EngineConfig::new(Schedule::rate(10))
            .with_one_shot(MockGun::new(Duration::from_millis(20)))
            .with_name("node_rpc")
            .with_label("cluster", "staging")
            .with_stats_poll_interval(Duration::from_millis(300))
            .with_duration(Duration::from_secs(1))
            .with_sink(sink.clone()),
    )?;
    let outcome = engine.run().await?;

    let responses = sink.entries_with("test_data_type", "responses");
    assert_eq!(responses.len() as u64, outcome.stats.success);
    for entry in &responses {
        assert_eq!(entry.labels["gen_name"], "node_rpc");
        assert_eq!(entry.labels["cluster"], "staging");
    }

    // three periodic pushes and a final one after drain
    let stats = sink.entries_with("test_data_type", "stats");
    assert_eq!(stats.len(), 4);
    let last = stats.last().map(|e| e.line.clone()).unwrap_or_default();
    let final_stats: StatsSnapshot = serde_json::from_str(&last)?;
    assert_eq!(final_stats, outcome.stats);
    assert!(final_stats.run_stopped);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_streamed() -> Result<()> {
    let sink = Arc::new(InMemorySink::new());
    let engine = Engine::new(
        EngineConfig::new(Schedule::rate(1))
            .with_one_shot(MockGun::failing(Duration::from_millis(10)))
            .with_duration(Duration::from_millis(1500))
            .with_sink(sink.clone()),
    )?;
    let outcome = engine.run().await?;
    assert!(outcome.failed);

    let responses = sink.entries_with("test_data_type", "responses");
    assert_eq!(responses.len(), 2);
    let line: serde_json::Value = serde_json::from_str(&responses[0].line)?;
    assert_eq!(line["error"], "error");
    assert_eq!(line["failed"], true);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_skipped_successes_are_not_streamed() -> Result<()> {
    let sink = Arc::new(InMemorySink::new());
    let engine = Engine::new(
        EngineConfig::new(Schedule::rate(20))
            .with_one_shot(MockGun::new(Duration::from_millis(10)))
            .with_success_record_ratio(10)
            .with_duration(Duration::from_secs(1))
            .with_sink(sink.clone()),
    )?;
    let outcome = engine.run().await?;

    let responses = sink.entries_with("test_data_type", "responses");
    assert_eq!(responses.len() as u64, outcome.stats.samples_recorded);
    assert_eq!(responses.len(), outcome.data.ok_results.len());
    assert!(outcome.stats.samples_skipped > outcome.stats.samples_recorded);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start_pushes_nothing() -> Result<()> {
    let sink = Arc::new(InMemorySink::new());
    let engine = Engine::new(
        EngineConfig::new(Schedule::rate(10))
            .with_one_shot(MockGun::new(Duration::from_millis(10)))
            .with_sink(sink.clone()),
    )?;
    let outcome = engine.stop().await;

    assert_eq!(outcome.stats.success, 0);
    assert!(sink.is_empty());
    assert!(engine.start().is_err());
    Ok(())
}
