//! Configuration for volley load generators
//!
//! This crate holds everything needed to describe a load run before any
//! concurrent activity starts: the intensity [`Schedule`], the
//! [`RunSettings`] (timeouts, thresholds, labels) and the validation rules
//! that make construction fail fast.

pub mod error;
pub mod profile;
pub mod schedule;
pub mod settings;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use profile::LoadProfile;
pub use schedule::{Schedule, ScheduleKind, MIN_STAGE_INTERVAL};
pub use settings::{
    RunSettings, DEFAULT_CALL_TIMEOUT, DEFAULT_GENERATOR_NAME, DEFAULT_RESULT_BUFFER,
    DEFAULT_SETUP_TIMEOUT, DEFAULT_STATS_POLL_INTERVAL, DEFAULT_SUCCESS_RECORD_RATIO,
    DEFAULT_TEARDOWN_TIMEOUT,
};
pub use validation::Validatable;
