//! Telemetry sink contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Label set attached to a pushed line
pub type Labels = BTreeMap<String, String>;

/// Errors returned by telemetry sinks
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Stdio error on {stream}: {error}")]
    Stdio { stream: String, error: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink rejected push: {0}")]
    Rejected(String),
}

/// One pushed line with its labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub labels: Labels,
    pub timestamp: DateTime<Utc>,
    pub line: String,
}

/// Destination for generator telemetry
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Push one line
    async fn push(
        &self,
        labels: &Labels,
        timestamp: DateTime<Utc>,
        line: String,
    ) -> Result<(), SinkError>;

    /// Flush buffered lines; called once after the generator drained
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
