//! Generator configuration
//!
//! [`EngineConfig`] collects the serialisable [`LoadProfile`] parts together
//! with what can only be given in code: the workload, the shared input and an
//! optional telemetry sink. It is resolved once, at construction, into a
//! [`ValidatedConfig`].

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use volley_config::{
    ConfigError, ConfigResult, LoadProfile, RunSettings, Schedule, ScheduleKind, Validatable,
};
use volley_core::{OneShotCall, PersistentWorker, Workload};
use volley_output::TelemetrySink;

/// Everything a generator is built from
#[derive(Clone, Default)]
pub struct EngineConfig {
    pub schedule: Option<Schedule>,
    pub settings: RunSettings,
    pub one_shot: Option<Arc<dyn OneShotCall>>,
    pub persistent: Option<Arc<dyn PersistentWorker>>,
    pub shared_input: JsonValue,
    pub sink: Option<Arc<dyn TelemetrySink>>,
}

impl EngineConfig {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Some(schedule),
            ..Default::default()
        }
    }

    /// Start from a profile loaded from a file
    pub fn from_profile(profile: LoadProfile) -> Self {
        Self {
            schedule: Some(profile.schedule),
            settings: profile.settings,
            ..Default::default()
        }
    }

    pub fn with_one_shot(mut self, call: impl OneShotCall) -> Self {
        self.one_shot = Some(Arc::new(call));
        self
    }

    pub fn with_persistent(mut self, worker: impl PersistentWorker) -> Self {
        self.persistent = Some(Arc::new(worker));
        self
    }

    pub fn with_shared_input(mut self, input: impl Into<JsonValue>) -> Self {
        self.shared_input = input.into();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.settings.duration = Some(duration);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.settings.call_timeout = timeout;
        self
    }

    pub fn with_stats_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.stats_poll_interval = interval;
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.settings.setup_timeout = timeout;
        self
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.settings.teardown_timeout = timeout;
        self
    }

    pub fn with_fail_threshold(mut self, threshold: u64) -> Self {
        self.settings.fail_threshold = Some(threshold);
        self
    }

    pub fn with_timeout_threshold(mut self, threshold: u64) -> Self {
        self.settings.timeout_threshold = Some(threshold);
        self
    }

    pub fn fail_on_error(mut self, enabled: bool) -> Self {
        self.settings.fail_on_error = enabled;
        self
    }

    /// Keep only `ratio` percent of successful results
    pub fn with_success_record_ratio(mut self, ratio: u8) -> Self {
        self.settings.success_record_ratio = ratio;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.labels.insert(key.into(), value.into());
        self
    }

    /// Check the configuration and resolve the workload.
    ///
    /// Workload presence is checked before field values.
    pub fn validate(self) -> ConfigResult<ValidatedConfig> {
        let schedule = self.schedule.ok_or(ConfigError::MissingConfig("schedule"))?;

        let workload = match (self.one_shot, self.persistent) {
            (None, None) => return Err(ConfigError::NoWorkload),
            (Some(_), Some(_)) => return Err(ConfigError::DualWorkload),
            (Some(call), None) => Workload::OneShot(call),
            (None, Some(worker)) => Workload::Persistent(worker),
        };

        match (schedule.kind, &workload) {
            (ScheduleKind::Rate, Workload::Persistent(_)) => {
                return Err(ConfigError::WorkloadMismatch {
                    kind: ScheduleKind::Rate,
                    workload: "one-shot call",
                })
            }
            (ScheduleKind::Concurrency, Workload::OneShot(_)) => {
                return Err(ConfigError::WorkloadMismatch {
                    kind: ScheduleKind::Concurrency,
                    workload: "persistent worker",
                })
            }
            _ => {}
        }

        schedule.validate()?;
        self.settings.validate()?;

        Ok(ValidatedConfig {
            schedule,
            settings: self.settings,
            workload,
            shared_input: Arc::new(self.shared_input),
            sink: self.sink,
        })
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("schedule", &self.schedule)
            .field("settings", &self.settings)
            .field("one_shot", &self.one_shot.is_some())
            .field("persistent", &self.persistent.is_some())
            .field("shared_input", &self.shared_input)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Configuration that passed validation, with exactly one workload
pub struct ValidatedConfig {
    pub schedule: Schedule,
    pub settings: RunSettings,
    pub workload: Workload,
    pub shared_input: volley_core::SharedInput,
    pub sink: Option<Arc<dyn TelemetrySink>>,
}
