//! # Volley telemetry output
//!
//! A generator can stream stats lines and classified call results to a
//! [`TelemetrySink`]. Pushing is best-effort: the generator logs failures and
//! keeps running.
//!
//! ## Example
//!
//! ```rust
//! use volley_output::{InMemorySink, Labels, TelemetrySink};
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = InMemorySink::new();
//! let mut labels = Labels::new();
//! labels.insert("test_data_type".to_string(), "stats".to_string());
//! sink.push(&labels, Utc::now(), r#"{"success":1}"#.to_string()).await?;
//! assert_eq!(sink.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod sink;
pub mod sinks;

pub use sink::{Labels, SinkError, TelemetryEntry, TelemetrySink};
pub use sinks::{InMemorySink, StdStream, StdioSink};
