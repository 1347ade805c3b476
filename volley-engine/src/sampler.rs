//! Success sampling
//!
//! Long high-rate runs keep only a share of their successful results.
//! Selection is by stride over the success ordinal, so a ratio of 50 keeps
//! every second success and the kept count never drifts from the ratio by
//! more than one.

use std::sync::atomic::{AtomicU64, Ordering};

use volley_core::Stats;

#[derive(Debug)]
pub(crate) struct Sampler {
    ratio: u64,
    successes: AtomicU64,
}

impl Sampler {
    pub fn new(ratio: u8) -> Self {
        Self {
            ratio: u64::from(ratio.min(100)),
            successes: AtomicU64::new(0),
        }
    }

    /// Whether a result goes to the result log and the telemetry stream.
    /// Failures are always kept.
    pub fn should_record(&self, failed: bool, stats: &Stats) -> bool {
        let keep = failed || self.keep_success();
        stats.record_sample(keep);
        keep
    }

    fn keep_success(&self) -> bool {
        if self.ratio >= 100 {
            return true;
        }
        let n = self.successes.fetch_add(1, Ordering::Relaxed) + 1;
        n * self.ratio / 100 > (n - 1) * self.ratio / 100
    }
}
