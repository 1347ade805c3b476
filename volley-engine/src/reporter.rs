//! Stats reporting and telemetry streaming

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use volley_config::RunSettings;
use volley_core::{CallResult, Stats, StatsSnapshot};
use volley_output::{Labels, TelemetrySink};

const DATA_TYPE_LABEL: &str = "test_data_type";
const STATS_DATA: &str = "stats";
const RESPONSES_DATA: &str = "responses";

/// Labelled view of a telemetry sink
pub(crate) struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    stats_labels: Labels,
    responses_labels: Labels,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>, settings: &RunSettings) -> Self {
        let mut base: Labels = settings
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        base.insert("gen_name".to_string(), settings.name.clone());

        let mut stats_labels = base.clone();
        stats_labels.insert(DATA_TYPE_LABEL.to_string(), STATS_DATA.to_string());
        let mut responses_labels = base;
        responses_labels.insert(DATA_TYPE_LABEL.to_string(), RESPONSES_DATA.to_string());

        Self {
            sink,
            stats_labels,
            responses_labels,
        }
    }

    pub async fn push_stats(&self, snapshot: &StatsSnapshot) {
        let line = match serde_json::to_string(snapshot) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode stats");
                return;
            }
        };
        if let Err(e) = self.sink.push(&self.stats_labels, Utc::now(), line).await {
            warn!(error = %e, "Failed to push stats telemetry");
        }
    }

    pub async fn push_result(&self, result: &CallResult) {
        let line = match serde_json::to_string(result) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode call result");
                return;
            }
        };
        let timestamp = result.finished_at.unwrap_or_else(Utc::now);
        if let Err(e) = self.sink.push(&self.responses_labels, timestamp, line).await {
            warn!(error = %e, "Failed to push response telemetry");
        }
    }

    pub async fn flush(&self) {
        if let Err(e) = self.sink.flush().await {
            warn!(error = %e, "Failed to flush telemetry");
        }
    }

    /// Forward streamed results until `stop` fires, then push what is left
    pub async fn stream_results(
        self: Arc<Self>,
        mut results: mpsc::Receiver<CallResult>,
        stop: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(result) = results.recv() => self.push_result(&result).await,
                _ = stop.cancelled() => break,
            }
        }
        while let Ok(result) = results.try_recv() {
            self.push_result(&result).await;
        }
        debug!("Response stream closed");
    }
}

/// Telemetry that outlives the run tasks: results keep streaming while the
/// generator drains and are flushed after it.
pub(crate) struct TelemetryPipe {
    telemetry: Arc<Telemetry>,
    results: parking_lot::Mutex<Option<mpsc::Receiver<CallResult>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl TelemetryPipe {
    pub fn new(telemetry: Telemetry, results: mpsc::Receiver<CallResult>) -> Self {
        Self {
            telemetry: Arc::new(telemetry),
            results: parking_lot::Mutex::new(Some(results)),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Start streaming results; later calls are no-ops
    pub fn start(&self) {
        if let Some(results) = self.results.lock().take() {
            self.tracker.spawn(
                self.telemetry
                    .clone()
                    .stream_results(results, self.shutdown.clone()),
            );
        }
    }

    /// Push remaining results, the final stats line, and flush
    pub async fn finish(&self, final_stats: &StatsSnapshot) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.telemetry.push_stats(final_stats).await;
        self.telemetry.flush().await;
    }
}

/// Log a stats line, and push it when telemetry is configured, every
/// `period` until cancelled
pub(crate) async fn report_stats(
    stats: Arc<Stats>,
    period: Duration,
    telemetry: Option<Arc<Telemetry>>,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = stats.snapshot();
                info!(
                    success = snapshot.success,
                    failed = snapshot.failed,
                    timed_out = snapshot.timed_out,
                    samples_skipped = snapshot.samples_skipped,
                    current_rate = snapshot.current_rate,
                    current_concurrency = snapshot.current_concurrency,
                    paused = snapshot.run_paused,
                    "Load stats"
                );
                if let Some(telemetry) = &telemetry {
                    telemetry.push_stats(&snapshot).await;
                }
            }
        }
    }
    debug!("Stats reporter stopped");
}
