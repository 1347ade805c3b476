//! Result aggregation
//!
//! Every result from every producer passes through [`Aggregator::record`],
//! which classifies it, updates the counters, appends it to the result log
//! and hands a copy to the telemetry stream. Successes pass the sampler
//! first. The threshold watchdog runs inline after each record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use volley_config::RunSettings;
use volley_core::{CallResult, ResultLog, Stats, StopReason, ERR_CALL_TIMEOUT};

use crate::lifecycle::Lifecycle;
use crate::sampler::Sampler;

/// Which limit a run exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Breach {
    Failures { count: u64, threshold: u64 },
    Timeouts { count: u64, threshold: u64 },
    FirstError,
}

impl std::fmt::Display for Breach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breach::Failures { count, threshold } => {
                write!(f, "{count} failed calls exceed the threshold of {threshold}")
            }
            Breach::Timeouts { count, threshold } => {
                write!(f, "{count} timed out calls exceed the threshold of {threshold}")
            }
            Breach::FirstError => write!(f, "call failed with fail_on_error set"),
        }
    }
}

/// Failure and timeout limits, tripping at most once
#[derive(Debug)]
pub(crate) struct ThresholdWatchdog {
    fail_threshold: Option<u64>,
    timeout_threshold: Option<u64>,
    fail_on_error: bool,
    tripped: AtomicBool,
}

impl ThresholdWatchdog {
    pub fn new(settings: &RunSettings) -> Self {
        Self {
            fail_threshold: settings.effective_fail_threshold(),
            timeout_threshold: settings.effective_timeout_threshold(),
            fail_on_error: settings.fail_on_error,
            tripped: AtomicBool::new(false),
        }
    }

    /// Limit exceeded by the current counters, if any
    pub fn check(&self, stats: &Stats) -> Option<Breach> {
        let failed = stats.failed();
        if self.fail_on_error && failed > 0 {
            return Some(Breach::FirstError);
        }
        if let Some(threshold) = self.fail_threshold {
            if failed > threshold {
                return Some(Breach::Failures { count: failed, threshold });
            }
        }
        if let Some(threshold) = self.timeout_threshold {
            let timed_out = stats.timed_out();
            if timed_out > threshold {
                return Some(Breach::Timeouts { count: timed_out, threshold });
            }
        }
        None
    }

    /// Returns the breach only for the first caller that observes one
    pub fn trip(&self, stats: &Stats) -> Option<Breach> {
        if self.tripped.load(Ordering::Acquire) {
            return None;
        }
        let breach = self.check(stats)?;
        self.tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| breach)
    }
}

pub(crate) struct Aggregator {
    stats: Arc<Stats>,
    log: Arc<ResultLog>,
    watchdog: ThresholdWatchdog,
    sampler: Sampler,
    lifecycle: Arc<Lifecycle>,
    telemetry: Option<mpsc::Sender<CallResult>>,
}

impl Aggregator {
    pub fn new(
        settings: &RunSettings,
        stats: Arc<Stats>,
        log: Arc<ResultLog>,
        lifecycle: Arc<Lifecycle>,
        telemetry: Option<mpsc::Sender<CallResult>>,
    ) -> Self {
        Self {
            stats,
            log,
            watchdog: ThresholdWatchdog::new(settings),
            sampler: Sampler::new(settings.success_record_ratio),
            lifecycle,
            telemetry,
        }
    }

    /// Classify and store one result.
    ///
    /// A timeout wins over any error carried by the result, which wins over
    /// success.
    pub fn record(&self, result: CallResult, is_timeout: bool) {
        if is_timeout || result.timeout {
            let mut timed_out = CallResult::timed_out(result.duration);
            timed_out.started_at = result.started_at;
            if result.finished_at.is_some() {
                timed_out.finished_at = result.finished_at;
            }
            self.stats.record_timeout();
            error!(error = ERR_CALL_TIMEOUT, "load generator request timed out");
            self.sampler.should_record(true, &self.stats);
            self.stream(&timed_out);
            self.log.push_fail(timed_out);
        } else if result.is_failure() {
            self.stats.record_failure();
            error!(
                error = result.error_message().unwrap_or_default(),
                "load generator request failed"
            );
            self.sampler.should_record(true, &self.stats);
            self.stream(&result);
            self.log.push_fail(result);
        } else {
            self.stats.record_success();
            if self.sampler.should_record(false, &self.stats) {
                self.stream(&result);
                self.log.push_ok(result);
            }
        }

        self.enforce_thresholds();
    }

    fn stream(&self, result: &CallResult) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        if let Err(mpsc::error::TrySendError::Full(_)) = telemetry.try_send(result.clone()) {
            debug!("Telemetry stream is full, dropping result");
        }
    }

    fn enforce_thresholds(&self) {
        if let Some(breach) = self.watchdog.trip(&self.stats) {
            self.stats.mark_failed();
            warn!(breach = %breach, "Error threshold reached, stopping generator");
            self.lifecycle.cancel(StopReason::ThresholdBreached);
        }
    }
}
