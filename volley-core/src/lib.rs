//! Core types for volley load generators
//!
//! - [`CallResult`]: the outcome of one unit of work
//! - [`Workload`]: the pluggable work, either a one-shot call or a persistent worker
//! - [`Stats`]: lock-free run counters
//! - [`ResultLog`]: per-bucket locked result storage

pub mod result;
pub mod result_log;
pub mod stats;
pub mod workload;

pub use result::{CallResult, ERR_CALL_PANICKED, ERR_CALL_TIMEOUT};
pub use result_log::{ResultData, ResultLog};
pub use stats::{Stats, StatsSnapshot, StopReason};
pub use workload::{
    OneShotCall, PersistentWorker, ResultIntake, SharedInput, WorkerContext, Workload,
    WorkloadError,
};
