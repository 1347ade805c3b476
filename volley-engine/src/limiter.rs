//! Leaky-bucket rate limiter
//!
//! Permits are handed out on a fixed grid of absolute deadlines, one every
//! `unit / rate`. A caller that wakes up late gets the missed permits back to
//! back, bounded by a slack of ten intervals, so the long-run rate does not
//! drift with timer latency.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

const SLACK_PERMITS: u32 = 10;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    max_slack: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    /// Limiter issuing `rate` permits per `unit`
    pub fn new(rate: u64, unit: Duration) -> Self {
        let nanos = unit.as_nanos() / u128::from(rate.max(1));
        let interval = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX).max(1));
        Self {
            interval,
            max_slack: interval.saturating_mul(SLACK_PERMITS),
            last: None,
        }
    }

    /// Time between two permits
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next permit and return its deadline.
    ///
    /// Cancel safe: a dropped call does not consume a permit.
    pub async fn take(&mut self) -> Instant {
        let now = Instant::now();
        let next = match self.last {
            None => now,
            Some(last) => {
                let scheduled = last + self.interval;
                match now.checked_sub(self.max_slack) {
                    Some(floor) if floor > scheduled => floor,
                    _ => scheduled,
                }
            }
        };
        if next > now {
            sleep_until(next).await;
        }
        self.last = Some(next);
        next
    }
}
