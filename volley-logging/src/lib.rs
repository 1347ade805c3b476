//! Structured logging setup for volley
//!
//! The engine only emits `tracing` events; this crate installs a subscriber
//! for binaries and test harnesses that drive it.

pub mod config;
pub mod init;

pub use config::{LogFormat, LogLevel, LoggingConfig};
pub use init::{init_logging, init_simple_tracing, init_test_tracing};
