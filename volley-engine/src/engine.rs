//! The load generator
//!
//! An [`Engine`] is built from an [`EngineConfig`], started once, and then
//! either stopped explicitly or waited on until its duration elapses or a
//! failure threshold trips. Stopping drains every in-flight call and worker
//! before results are returned, so a [`RunOutcome`] is always complete.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use volley_config::{RunSettings, Schedule};
use volley_core::{
    ResultData, ResultIntake, ResultLog, SharedInput, Stats, StatsSnapshot, StopReason, Workload,
};

use crate::aggregator::Aggregator;
use crate::config::EngineConfig;
use crate::dispatcher::{collect_results, dispatch_calls, dispatch_workers, RunContext};
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{EngineState, Lifecycle};
use crate::pacer::Pacer;
use crate::reporter::{report_stats, Telemetry, TelemetryPipe};

/// Final results of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub data: ResultData,
    /// Whether any call failed or a threshold tripped
    pub failed: bool,
    pub stats: StatsSnapshot,
}

/// Handle to a load generator. Clones share the same run.
///
/// Dropping the last handle cancels the run without waiting for it.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    schedule: Schedule,
    settings: RunSettings,
    workload: Workload,
    input: SharedInput,
    stats: Arc<Stats>,
    log: Arc<ResultLog>,
    lifecycle: Arc<Lifecycle>,
    aggregator: Arc<Aggregator>,
    telemetry: Option<TelemetryPipe>,
    drained: OnceCell<()>,
    span: Span,
}

impl Engine {
    /// Validate the configuration and build an idle generator
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let config = config.validate()?;
        let settings = config.settings;

        let stats = Arc::new(Stats::new());
        let log = Arc::new(ResultLog::new());
        let lifecycle = Arc::new(Lifecycle::new(stats.clone()));

        let (telemetry, stream) = match config.sink {
            Some(sink) => {
                let (tx, rx) = mpsc::channel(settings.result_buffer);
                let pipe = TelemetryPipe::new(Telemetry::new(sink, &settings), rx);
                (Some(pipe), Some(tx))
            }
            None => (None, None),
        };
        let aggregator = Arc::new(Aggregator::new(
            &settings,
            stats.clone(),
            log.clone(),
            lifecycle.clone(),
            stream,
        ));

        let span = info_span!("generator", name = %settings.name);
        span.in_scope(|| {
            debug!(
                kind = %config.schedule.kind,
                start_from = config.schedule.start_from,
                workload = config.workload.name(),
                "Generator created"
            )
        });

        Ok(Self {
            inner: Arc::new(EngineInner {
                schedule: config.schedule,
                settings,
                workload: config.workload,
                input: config.shared_input,
                stats,
                log,
                lifecycle,
                aggregator,
                telemetry,
                drained: OnceCell::new(),
                span,
            }),
        })
    }

    /// Begin generating load. Returns immediately; calling it on a running
    /// generator does nothing.
    pub fn start(&self) -> EngineResult<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(EngineError::NoRuntime);
        }
        let started = self.inner.lifecycle.begin(|| self.inner.spawn_run())?;
        if !started {
            self.inner
                .span
                .in_scope(|| debug!("Generator already running"));
        }
        Ok(())
    }

    /// Cancel the run and wait for every in-flight unit of work to finish.
    ///
    /// Safe to call repeatedly and concurrently with [`Engine::wait`]; every
    /// caller gets the same final results.
    pub async fn stop(&self) -> RunOutcome {
        if self.inner.lifecycle.cancel(StopReason::Requested) {
            self.inner.span.in_scope(|| warn!("Graceful stop"));
        }
        self.finish().await
    }

    /// Wait until the run ends on its own (duration or threshold) or is
    /// stopped, then drain and return the results.
    ///
    /// A generator that was never started returns at once with empty
    /// results and can no longer be started.
    pub async fn wait(&self) -> RunOutcome {
        if self.inner.lifecycle.state() != EngineState::Created {
            self.inner.lifecycle.shutdown_token().cancelled().await;
        }
        self.finish().await
    }

    /// Start and wait
    pub async fn run(&self) -> EngineResult<RunOutcome> {
        self.start()?;
        Ok(self.wait().await)
    }

    /// Stop issuing new work until [`Engine::resume`]. In-flight work keeps
    /// running; persistent workers are expected to check
    /// [`volley_core::WorkerContext::is_paused`].
    pub fn pause(&self) {
        self.inner.stats.set_paused(true);
        self.inner.span.in_scope(|| warn!("Generator paused"));
    }

    pub fn resume(&self) {
        self.inner.stats.set_paused(false);
        self.inner.span.in_scope(|| warn!("Generator resumed"));
    }

    pub fn state(&self) -> EngineState {
        self.inner.lifecycle.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Results recorded so far; final once the generator is stopped
    pub fn data(&self) -> ResultData {
        self.inner.log.snapshot()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.log.errors()
    }

    pub fn shared_input(&self) -> &JsonValue {
        &self.inner.input
    }

    pub fn name(&self) -> &str {
        &self.inner.settings.name
    }

    async fn finish(&self) -> RunOutcome {
        let inner = &self.inner;
        inner
            .drained
            .get_or_init(|| inner.drain().instrument(inner.span.clone()))
            .await;
        RunOutcome {
            data: inner.log.snapshot(),
            failed: inner.stats.run_failed(),
            stats: inner.stats.snapshot(),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.inner.settings.name)
            .field("schedule", &self.inner.schedule)
            .field("workload", &self.inner.workload)
            .field("state", &self.inner.lifecycle.state())
            .finish()
    }
}

impl EngineInner {
    /// Spawn the dispatcher, reporter and duration timer. Runs once, under
    /// the lifecycle lock.
    fn spawn_run(&self) {
        let _enter = self.span.enter();
        info!(
            kind = %self.schedule.kind,
            start_from = self.schedule.start_from,
            duration = ?self.settings.duration,
            "Starting generator"
        );

        let tracker = self.lifecycle.tracker();
        let shutdown = self.lifecycle.shutdown_token().clone();
        let pacer = Pacer::new(self.schedule.clone(), self.stats.clone());
        let run = Arc::new(RunContext {
            settings: self.settings.clone(),
            input: self.input.clone(),
            stats: self.stats.clone(),
            aggregator: self.aggregator.clone(),
            lifecycle: self.lifecycle.clone(),
            span: self.span.clone(),
        });

        match &self.workload {
            Workload::OneShot(call) => {
                tracker.spawn(dispatch_calls(run, pacer, call.clone()).in_current_span());
            }
            Workload::Persistent(worker) => {
                let (intake, results) = ResultIntake::channel(self.settings.result_buffer);
                tracker.spawn(collect_results(results, self.aggregator.clone()).in_current_span());
                tracker.spawn(
                    dispatch_workers(run, pacer, worker.clone(), intake).in_current_span(),
                );
            }
        }

        let telemetry = self.telemetry.as_ref().map(|pipe| {
            pipe.start();
            pipe.telemetry()
        });
        tracker.spawn(
            report_stats(
                self.stats.clone(),
                self.settings.stats_poll_interval,
                telemetry,
                shutdown.clone(),
            )
            .in_current_span(),
        );

        if let Some(duration) = self.settings.duration {
            let lifecycle = self.lifecycle.clone();
            tracker.spawn(
                async move {
                    tokio::select! {
                        _ = tokio::time::sleep(duration) => {
                            lifecycle.cancel(StopReason::DurationElapsed);
                        }
                        _ = shutdown.cancelled() => {}
                    }
                }
                .in_current_span(),
            );
        }
    }

    async fn drain(&self) {
        let ran = self.lifecycle.close();
        info!("Waiting for all responses to finish");
        self.lifecycle.wait_idle().await;

        if ran {
            if let Some(pipe) = &self.telemetry {
                pipe.finish(&self.stats.snapshot()).await;
            }
        }
        self.lifecycle.mark_terminated();

        let stats = self.stats.snapshot();
        info!(
            success = stats.success,
            failed = stats.failed,
            timed_out = stats.timed_out,
            reason = ?stats.stop_reason,
            "Generator stopped"
        );
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.lifecycle.shutdown_token().cancel();
    }
}
