//! Run statistics
//!
//! Every counter is an independent atomic. Readers see a consistent value per
//! counter, not a consistent view across counters.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// What ended a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// The configured duration elapsed
    DurationElapsed,
    /// A failure or timeout threshold was exceeded
    ThresholdBreached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "requested"),
            StopReason::DurationElapsed => write!(f, "duration elapsed"),
            StopReason::ThresholdBreached => write!(f, "threshold breached"),
        }
    }
}

/// Live counters of a generator
#[derive(Debug, Default)]
pub struct Stats {
    success: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    current_rate: AtomicU64,
    current_concurrency: AtomicU64,
    samples_recorded: AtomicU64,
    samples_skipped: AtomicU64,
    run_failed: AtomicBool,
    run_paused: AtomicBool,
    run_stopped: AtomicBool,
    stop_reason: Mutex<Option<StopReason>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failure; marks the run failed
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.mark_failed();
    }

    /// Count a timeout, which is also a failure; marks the run failed
    pub fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
        self.record_failure();
    }

    /// Count a result the sampler kept or dropped
    pub fn record_sample(&self, kept: bool) {
        let counter = if kept {
            &self.samples_recorded
        } else {
            &self.samples_skipped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the sticky run failure flag
    pub fn mark_failed(&self) {
        self.run_failed.store(true, Ordering::Release);
    }

    /// Only the pacer updates the current stage values
    pub fn set_current_rate(&self, rate: u64) {
        self.current_rate.store(rate, Ordering::Release);
    }

    pub fn set_current_concurrency(&self, workers: u64) {
        self.current_concurrency.store(workers, Ordering::Release);
    }

    pub fn set_paused(&self, paused: bool) {
        self.run_paused.store(paused, Ordering::Release);
    }

    /// Record why the run stopped. The first reason wins; returns whether
    /// this call set it.
    pub fn mark_stopped(&self, reason: StopReason) -> bool {
        let mut current = self.stop_reason.lock();
        if current.is_some() {
            return false;
        }
        *current = Some(reason);
        self.run_stopped.store(true, Ordering::Release);
        true
    }

    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn samples_recorded(&self) -> u64 {
        self.samples_recorded.load(Ordering::Relaxed)
    }

    pub fn samples_skipped(&self) -> u64 {
        self.samples_skipped.load(Ordering::Relaxed)
    }

    pub fn current_rate(&self) -> u64 {
        self.current_rate.load(Ordering::Acquire)
    }

    pub fn current_concurrency(&self) -> u64 {
        self.current_concurrency.load(Ordering::Acquire)
    }

    pub fn run_failed(&self) -> bool {
        self.run_failed.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.run_paused.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.run_stopped.load(Ordering::Acquire)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        *self.stop_reason.lock()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            current_rate: self.current_rate(),
            current_concurrency: self.current_concurrency(),
            run_paused: self.is_paused(),
            run_stopped: self.is_stopped(),
            run_failed: self.run_failed(),
            success: self.success(),
            failed: self.failed(),
            timed_out: self.timed_out(),
            samples_recorded: self.samples_recorded(),
            samples_skipped: self.samples_skipped(),
            stop_reason: self.stop_reason(),
        }
    }
}

/// Point-in-time copy of [`Stats`], suitable for export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub current_rate: u64,
    pub current_concurrency: u64,
    pub run_paused: bool,
    pub run_stopped: bool,
    pub run_failed: bool,
    pub success: u64,
    pub failed: u64,
    pub timed_out: u64,
    #[serde(default)]
    pub samples_recorded: u64,
    #[serde(default)]
    pub samples_skipped: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_counts_as_failure() {
        let stats = Stats::new();
        stats.record_success();
        stats.record_timeout();
        stats.record_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.timed_out, 1);
        assert!(snapshot.run_failed);
    }

    #[test]
    fn test_sample_counters() {
        let stats = Stats::new();
        stats.record_sample(true);
        stats.record_sample(false);
        stats.record_sample(true);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_recorded, 2);
        assert_eq!(snapshot.samples_skipped, 1);
        assert_eq!(snapshot.success, 0);
    }

    #[test]
    fn test_first_stop_reason_wins() {
        let stats = Stats::new();
        assert!(!stats.is_stopped());
        assert!(stats.mark_stopped(StopReason::DurationElapsed));
        assert!(!stats.mark_stopped(StopReason::Requested));
        assert_eq!(stats.stop_reason(), Some(StopReason::DurationElapsed));
        assert!(stats.is_stopped());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let stats = Stats::new();
        stats.set_current_rate(100);
        let value = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(value["current_rate"], 100);
        assert_eq!(value["run_failed"], false);
        assert!(value.get("stop_reason").is_none());
    }
}
