//! Concrete telemetry sinks

pub mod memory;
pub mod stdio;

pub use memory::InMemorySink;
pub use stdio::{StdStream, StdioSink};
