//! Schedule pacing
//!
//! The pacer turns a [`Schedule`] into either a stream of rate permits or a
//! sequence of worker-count targets, advancing one stage every
//! `stage_interval` until the limit is reached.

use std::sync::Arc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::info;

use volley_config::{Schedule, ScheduleKind};
use volley_core::Stats;

use crate::limiter::RateLimiter;

pub(crate) struct Pacer {
    schedule: Schedule,
    stats: Arc<Stats>,
    current: u64,
    limiter: RateLimiter,
    stages: Option<Interval>,
}

impl Pacer {
    pub fn new(schedule: Schedule, stats: Arc<Stats>) -> Self {
        let current = schedule.start_from;
        let stages = schedule
            .stage_interval
            .filter(|_| schedule.next_stage(current).is_some())
            .map(|period| {
                let mut stages = interval_at(Instant::now() + period, period);
                stages.set_missed_tick_behavior(MissedTickBehavior::Delay);
                stages
            });
        let limiter = RateLimiter::new(current, schedule.rate_unit);
        let pacer = Self {
            schedule,
            stats,
            current,
            limiter,
            stages,
        };
        pacer.publish();
        pacer
    }

    /// Current stage intensity
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Wait for the next rate permit, applying stage changes on the way
    pub async fn permit(&mut self) {
        loop {
            tokio::select! {
                biased;
                _ = next_stage_tick(&mut self.stages) => {
                    self.advance();
                }
                _ = self.limiter.take() => return,
            }
        }
    }

    /// Wait for the next worker-count target. Pending forever once the
    /// schedule is static or capped.
    pub async fn next_target(&mut self) -> u64 {
        loop {
            next_stage_tick(&mut self.stages).await;
            if let Some(target) = self.advance() {
                return target;
            }
        }
    }

    fn advance(&mut self) -> Option<u64> {
        let Some(next) = self.schedule.next_stage(self.current) else {
            self.stages = None;
            return None;
        };
        self.current = next;
        if self.schedule.kind == ScheduleKind::Rate {
            self.limiter = RateLimiter::new(next, self.schedule.rate_unit);
        }
        self.publish();
        info!(kind = %self.schedule.kind, value = next, "Schedule stage");

        if self.schedule.next_stage(next).is_none() {
            info!(kind = %self.schedule.kind, value = next, "Schedule limit reached");
            self.stages = None;
        }
        Some(next)
    }

    fn publish(&self) {
        match self.schedule.kind {
            ScheduleKind::Rate => self.stats.set_current_rate(self.current),
            ScheduleKind::Concurrency => self.stats.set_current_concurrency(self.current),
        }
    }
}

async fn next_stage_tick(stages: &mut Option<Interval>) {
    match stages {
        Some(stages) => {
            stages.tick().await;
        }
        None => std::future::pending().await,
    }
}
