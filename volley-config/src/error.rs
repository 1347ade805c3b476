//! Configuration error types

use thiserror::Error;

use crate::schedule::ScheduleKind;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Construction-time configuration errors.
///
/// These are only ever returned while building a generator; nothing is
/// running yet when one of them is produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required part of the configuration was not provided
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Neither a one-shot call nor a persistent worker was supplied
    #[error("either a one-shot call or a persistent worker implementation must be provided")]
    NoWorkload,

    /// Both workload variants were supplied
    #[error("only one of one-shot call or persistent worker may be provided, got both")]
    DualWorkload,

    /// The workload variant does not fit the schedule kind
    #[error("{kind} schedule selected but the {workload} implementation is missing")]
    WorkloadMismatch {
        kind: ScheduleKind,
        workload: &'static str,
    },

    /// Field-level validation error
    #[error("Domain configuration error in {domain}: {message}")]
    DomainError { domain: String, message: String },

    /// YAML parsing error
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
