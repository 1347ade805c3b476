//! Serialisable load profile
//!
//! A [`LoadProfile`] is the part of a generator configuration that can live
//! in a file: the schedule plus run settings. Workloads, shared input and
//! telemetry sinks are supplied in code.

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::schedule::Schedule;
use crate::settings::RunSettings;
use crate::validation::Validatable;

/// Schedule and run settings for one generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub schedule: Schedule,

    #[serde(flatten)]
    pub settings: RunSettings,
}

impl LoadProfile {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            settings: RunSettings::default(),
        }
    }

    /// Parse and validate a YAML profile
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let profile: LoadProfile = serde_yaml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Parse and validate a JSON profile
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let profile: LoadProfile = serde_json::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }
}

impl Validatable for LoadProfile {
    fn validate(&self) -> ConfigResult<()> {
        self.schedule.validate()?;
        self.settings.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile"
    }
}
