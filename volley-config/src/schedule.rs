//! Load schedules
//!
//! A [`Schedule`] describes how load intensity evolves over a run. It starts
//! at `start_from` and, when ramping, grows by `increase` every
//! `stage_interval` until it reaches `limit`, where it holds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_min_duration, validate_positive, Validatable};

/// Shortest allowed time between two ramp stages
pub const MIN_STAGE_INTERVAL: Duration = Duration::from_secs(1);

/// What a schedule paces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Permits per rate unit, consumed by one-shot calls
    Rate,
    /// Number of simultaneously running persistent workers
    Concurrency,
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleKind::Rate => write!(f, "rate"),
            ScheduleKind::Concurrency => write!(f, "concurrency"),
        }
    }
}

/// Load intensity schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Whether this schedule paces a rate or a worker count
    pub kind: ScheduleKind,

    /// Initial intensity
    pub start_from: u64,

    /// Amount added at every stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increase: Option<u64>,

    /// Time between two stages
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub stage_interval: Option<Duration>,

    /// Intensity cap, held once reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Period the rate is expressed against
    #[serde(with = "humantime_serde", default = "default_rate_unit")]
    pub rate_unit: Duration,
}

fn default_rate_unit() -> Duration {
    Duration::from_secs(1)
}

impl Schedule {
    /// Static rate schedule: `rate` permits per second
    pub fn rate(rate: u64) -> Self {
        Self::fixed(ScheduleKind::Rate, rate)
    }

    /// Static concurrency schedule: `workers` persistent workers
    pub fn concurrency(workers: u64) -> Self {
        Self::fixed(ScheduleKind::Concurrency, workers)
    }

    fn fixed(kind: ScheduleKind, start_from: u64) -> Self {
        Self {
            kind,
            start_from,
            increase: None,
            stage_interval: None,
            limit: None,
            rate_unit: default_rate_unit(),
        }
    }

    /// Add a ramp: grow by `increase` every `stage_interval` up to `limit`
    pub fn ramp(mut self, increase: u64, stage_interval: Duration, limit: u64) -> Self {
        self.increase = Some(increase);
        self.stage_interval = Some(stage_interval);
        self.limit = Some(limit);
        self
    }

    /// Express the rate against a period other than one second
    pub fn per(mut self, rate_unit: Duration) -> Self {
        self.rate_unit = rate_unit;
        self
    }

    /// Whether any ramp field is set
    pub fn is_ramping(&self) -> bool {
        self.stage_interval.is_some()
            || self.limit.is_some()
            || self.increase.is_some_and(|inc| inc > 0)
    }

    /// Intensity of the stage following `current`.
    ///
    /// Returns `None` when the schedule is static or `current` already sits
    /// at (or above) the limit, so intensity never moves downward.
    pub fn next_stage(&self, current: u64) -> Option<u64> {
        let increase = self.increase.filter(|inc| *inc > 0)?;
        let limit = self.limit?;
        if current >= limit {
            return None;
        }
        Some(current.saturating_add(increase).min(limit))
    }
}

impl Validatable for Schedule {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.start_from, "start_from", self.domain_name())?;
        validate_min_duration(
            self.rate_unit,
            Duration::from_millis(1),
            "rate_unit",
            self.domain_name(),
        )?;

        if !self.is_ramping() {
            return Ok(());
        }

        validate_positive(self.increase.unwrap_or(0), "increase", self.domain_name())?;

        let Some(stage_interval) = self.stage_interval else {
            return Err(self.validation_error("stage_interval must be set when ramping"));
        };
        validate_min_duration(
            stage_interval,
            MIN_STAGE_INTERVAL,
            "stage_interval",
            self.domain_name(),
        )?;

        let Some(limit) = self.limit else {
            return Err(self.validation_error("limit must be set when ramping"));
        };
        validate_positive(limit, "limit", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "schedule"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn test_static_schedule_is_valid() {
        let schedule = Schedule::rate(10);
        assert!(!schedule.is_ramping());
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.next_stage(10), None);
    }

    #[test]
    fn test_zero_increase_alone_is_static() {
        let mut schedule = Schedule::concurrency(3);
        schedule.increase = Some(0);
        assert!(!schedule.is_ramping());
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.next_stage(3), None);
    }

    #[test]
    fn test_start_from_must_be_positive() {
        let err = Schedule::rate(0).validate().unwrap_err();
        assert!(err.to_string().contains("start_from must be greater than 0"));
    }

    #[test]
    fn test_ramp_validation() {
        let ok = Schedule::concurrency(1).ramp(2, Duration::from_secs(1), 10);
        assert!(ok.validate().is_ok());

        let zero_increase = Schedule::rate(1).ramp(0, Duration::from_secs(1), 10);
        assert!(zero_increase
            .validate()
            .unwrap_err()
            .to_string()
            .contains("increase must be greater than 0"));

        let short_stage = Schedule::rate(1).ramp(1, Duration::from_millis(500), 10);
        assert!(short_stage
            .validate()
            .unwrap_err()
            .to_string()
            .contains("stage_interval must be at least"));

        let zero_limit = Schedule::rate(1).ramp(1, Duration::from_secs(1), 0);
        assert!(zero_limit.validate().is_err());

        let mut no_limit = Schedule::rate(1);
        no_limit.increase = Some(5);
        no_limit.stage_interval = Some(Duration::from_secs(2));
        assert!(matches!(
            no_limit.validate(),
            Err(ConfigError::DomainError { ref message, .. }) if message == "limit must be set when ramping"
        ));

        let mut no_interval = Schedule::rate(1);
        no_interval.increase = Some(5);
        no_interval.limit = Some(20);
        assert!(no_interval.validate().is_err());
    }

    #[test]
    fn test_next_stage_caps_at_limit() {
        let schedule = Schedule::concurrency(1).ramp(2, Duration::from_secs(1), 10);
        let mut current = schedule.start_from;
        let mut stages = vec![current];
        while let Some(next) = schedule.next_stage(current) {
            assert!(next > current);
            current = next;
            stages.push(current);
        }
        assert_eq!(stages, vec![1, 3, 5, 7, 9, 10]);
        assert_eq!(schedule.next_stage(10), None);
    }

    #[test]
    fn test_limit_below_start_never_ramps() {
        let schedule = Schedule::rate(50).ramp(10, Duration::from_secs(1), 20);
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.next_stage(50), None);
    }

    #[test]
    fn test_deserialize_humantime() {
        let schedule: Schedule = serde_yaml::from_str(
            "kind: rate\nstart_from: 100\nincrease: 50\nstage_interval: 5s\nlimit: 400\n",
        )
        .unwrap();
        assert_eq!(schedule.kind, ScheduleKind::Rate);
        assert_eq!(schedule.stage_interval, Some(Duration::from_secs(5)));
        assert_eq!(schedule.rate_unit, Duration::from_secs(1));
        assert!(schedule.validate().is_ok());
    }
}
