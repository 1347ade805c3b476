//! Call results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Error text of a call that exceeded its timeout
pub const ERR_CALL_TIMEOUT: &str = "generator request call timeout";

/// Error text of a call whose future panicked
pub const ERR_CALL_PANICKED: &str = "generator call panicked";

/// Outcome of one unit of work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    /// Explicit failure flag, independent of `error`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,

    /// Set on results synthesised for a timed-out call
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,

    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Opaque payload produced by the workload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    /// Error text; absent or empty means success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    /// Successful result carrying `data`
    pub fn ok(data: impl Into<JsonValue>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Failed result with an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            failed: true,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Synthetic result for a call that exceeded its timeout
    pub fn timed_out(duration: Duration) -> Self {
        Self {
            timeout: true,
            duration,
            finished_at: Some(Utc::now()),
            error: Some(ERR_CALL_TIMEOUT.to_string()),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<JsonValue>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Whether the result counts as a failure
    pub fn is_failure(&self) -> bool {
        self.failed || self.error_message().is_some()
    }

    /// Non-empty error text, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}
