//! Run settings: timeouts, thresholds and labels

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_labels, validate_positive, Validatable};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_STATS_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RESULT_BUFFER: usize = 50_000;
pub const DEFAULT_SUCCESS_RECORD_RATIO: u8 = 100;
pub const DEFAULT_GENERATOR_NAME: &str = "generator";

/// Settings shared by every unit of work in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Generator name, used in logs and telemetry labels
    pub name: String,

    /// Total run time; `None` runs until explicitly stopped
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,

    /// Upper bound of a single call
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Period of the stats log line and stats telemetry push
    #[serde(with = "humantime_serde")]
    pub stats_poll_interval: Duration,

    /// Upper bound of a persistent worker's setup hook
    #[serde(with = "humantime_serde")]
    pub setup_timeout: Duration,

    /// Upper bound of a persistent worker's teardown hook
    #[serde(with = "humantime_serde")]
    pub teardown_timeout: Duration,

    /// Abort once more than this many calls failed; `None` or 0 disables
    pub fail_threshold: Option<u64>,

    /// Abort once more than this many calls timed out; `None` or 0 disables
    pub timeout_threshold: Option<u64>,

    /// Abort on the first failure or timeout
    pub fail_on_error: bool,

    /// Percentage of successful results kept in the result log and stream.
    /// Failures and timeouts are always kept.
    pub success_record_ratio: u8,

    /// Capacity of the worker result intake and the telemetry stream
    pub result_buffer: usize,

    /// Extra labels attached to every telemetry push
    pub labels: HashMap<String, String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_GENERATOR_NAME.to_string(),
            duration: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            stats_poll_interval: DEFAULT_STATS_POLL_INTERVAL,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
            fail_threshold: None,
            timeout_threshold: None,
            fail_on_error: false,
            success_record_ratio: DEFAULT_SUCCESS_RECORD_RATIO,
            result_buffer: DEFAULT_RESULT_BUFFER,
            labels: HashMap::new(),
        }
    }
}

impl RunSettings {
    /// Effective failure threshold, `None` when disabled
    pub fn effective_fail_threshold(&self) -> Option<u64> {
        self.fail_threshold.filter(|t| *t > 0)
    }

    /// Effective timeout threshold, `None` when disabled
    pub fn effective_timeout_threshold(&self) -> Option<u64> {
        self.timeout_threshold.filter(|t| *t > 0)
    }
}

impl Validatable for RunSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(self.validation_error("name cannot be empty"));
        }
        if let Some(duration) = self.duration {
            validate_positive(duration.as_nanos(), "duration", self.domain_name())?;
        }
        validate_positive(self.call_timeout.as_nanos(), "call_timeout", self.domain_name())?;
        validate_positive(
            self.stats_poll_interval.as_nanos(),
            "stats_poll_interval",
            self.domain_name(),
        )?;
        validate_positive(self.setup_timeout.as_nanos(), "setup_timeout", self.domain_name())?;
        validate_positive(
            self.teardown_timeout.as_nanos(),
            "teardown_timeout",
            self.domain_name(),
        )?;
        if self.success_record_ratio > 100 {
            return Err(self.validation_error(format!(
                "success_record_ratio must be between 0 and 100, got {}",
                self.success_record_ratio
            )));
        }
        validate_positive(self.result_buffer, "result_buffer", self.domain_name())?;
        validate_labels(&self.labels, self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RunSettings::default();
        assert_eq!(settings.call_timeout, Duration::from_secs(60));
        assert_eq!(settings.stats_poll_interval, Duration::from_secs(10));
        assert_eq!(settings.duration, None);
        assert_eq!(settings.effective_fail_threshold(), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_disables() {
        let settings = RunSettings {
            fail_threshold: Some(0),
            timeout_threshold: Some(3),
            ..Default::default()
        };
        assert_eq!(settings.effective_fail_threshold(), None);
        assert_eq!(settings.effective_timeout_threshold(), Some(3));
    }

    #[test]
    fn test_zero_call_timeout_rejected() {
        let settings = RunSettings {
            call_timeout: Duration::ZERO,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("call_timeout must be greater than 0"));
    }

    #[test]
    fn test_success_record_ratio_bounds() {
        let mut settings = RunSettings {
            success_record_ratio: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());

        settings.success_record_ratio = 101;
        let err = settings.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("success_record_ratio must be between 0 and 100, got 101"));
    }

    #[test]
    fn test_invalid_label_rejected() {
        let mut settings = RunSettings::default();
        settings.labels.insert("cluster-id".to_string(), "a".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings: RunSettings =
            serde_yaml::from_str("duration: 30s\ncall_timeout: 250ms\nfail_threshold: 10\n").unwrap();
        assert_eq!(settings.duration, Some(Duration::from_secs(30)));
        assert_eq!(settings.call_timeout, Duration::from_millis(250));
        assert_eq!(settings.fail_threshold, Some(10));
        assert_eq!(settings.stats_poll_interval, DEFAULT_STATS_POLL_INTERVAL);
        assert_eq!(settings.name, DEFAULT_GENERATOR_NAME);
        assert_eq!(settings.success_record_ratio, DEFAULT_SUCCESS_RECORD_RATIO);
    }
}
