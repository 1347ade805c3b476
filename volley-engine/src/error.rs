//! Engine error types

use thiserror::Error;
use volley_config::ConfigError;

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by the generator API
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration was rejected at construction
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The generator already stopped and cannot be started again
    #[error("generator has already been stopped")]
    Terminated,

    /// `start` was called outside a tokio runtime
    #[error("generator must be started from within a tokio runtime")]
    NoRuntime,
}
