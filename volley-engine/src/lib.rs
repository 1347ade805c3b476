//! Volley load generation engine
//!
//! Drives a pluggable workload at a scheduled intensity: either one-shot
//! calls at a (possibly ramping) rate, or a (possibly growing) pool of
//! persistent workers. Every result is classified into success, failure or
//! timeout; failure thresholds stop the run early, and a stop always drains
//! in-flight work before results are returned.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use std::time::Duration;
//! use volley_config::Schedule;
//! use volley_core::{CallResult, OneShotCall};
//! use volley_engine::{Engine, EngineConfig};
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl OneShotCall for Ping {
//!     async fn call(&self, _input: &Value) -> CallResult {
//!         CallResult::ok("pong")
//!     }
//! }
//!
//! # async fn example() -> Result<(), volley_engine::EngineError> {
//! let engine = Engine::new(
//!     EngineConfig::new(Schedule::rate(100))
//!         .with_one_shot(Ping)
//!         .with_duration(Duration::from_secs(10)),
//! )?;
//! let outcome = engine.run().await?;
//! assert!(!outcome.failed);
//! # Ok(())
//! # }
//! ```

mod aggregator;
pub mod config;
mod dispatcher;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod limiter;
mod pacer;
mod reporter;
mod sampler;

pub use config::{EngineConfig, ValidatedConfig};
pub use engine::{Engine, RunOutcome};
pub use error::{EngineError, EngineResult};
pub use lifecycle::EngineState;
pub use limiter::RateLimiter;
