//! Workload contracts
//!
//! A generator drives exactly one [`Workload`]: either a [`OneShotCall`]
//! invoked once per rate permit, or a [`PersistentWorker`] that runs until the
//! generator is cancelled and pushes its results into a [`ResultIntake`].

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::result::CallResult;
use crate::stats::Stats;

/// Opaque input handed to every invocation
pub type SharedInput = Arc<JsonValue>;

/// Errors a persistent worker may return from its lifecycle hooks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("{0}")]
    Failed(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// A single request, paced by the rate schedule
#[async_trait]
pub trait OneShotCall: Send + Sync + 'static {
    /// Perform one unit of work
    async fn call(&self, input: &JsonValue) -> CallResult;
}

/// A long-running worker, paced by the concurrency schedule
///
/// `run` must return once [`WorkerContext::cancelled`] resolves; the
/// generator waits for it during drain.
#[async_trait]
pub trait PersistentWorker: Send + Sync + 'static {
    /// Prepare the worker before it starts running
    async fn setup(&self, _ctx: &WorkerContext) -> Result<(), WorkloadError> {
        Ok(())
    }

    /// Run until cancelled, pushing results into the context's intake
    async fn run(&self, ctx: WorkerContext);

    /// Release worker resources after `run` returned
    async fn teardown(&self, _ctx: &WorkerContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

/// The workload a generator drives
#[derive(Clone)]
pub enum Workload {
    OneShot(Arc<dyn OneShotCall>),
    Persistent(Arc<dyn PersistentWorker>),
}

impl Workload {
    pub fn name(&self) -> &'static str {
        match self {
            Workload::OneShot(_) => "one-shot call",
            Workload::Persistent(_) => "persistent worker",
        }
    }
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Workload").field(&self.name()).finish()
    }
}

/// Sending half of the shared result intake
#[derive(Debug, Clone)]
pub struct ResultIntake {
    tx: mpsc::Sender<CallResult>,
}

impl ResultIntake {
    /// Create an intake with bounded capacity
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CallResult>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Push a result; returns false when the collector is gone
    pub async fn push(&self, result: CallResult) -> bool {
        self.tx.send(result).await.is_ok()
    }
}

/// Everything a persistent worker gets from the generator
#[derive(Debug, Clone)]
pub struct WorkerContext {
    id: u64,
    input: SharedInput,
    intake: ResultIntake,
    shutdown: CancellationToken,
    stats: Arc<Stats>,
    call_timeout: Duration,
}

impl WorkerContext {
    pub fn new(
        id: u64,
        input: SharedInput,
        intake: ResultIntake,
        shutdown: CancellationToken,
        stats: Arc<Stats>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            id,
            input,
            intake,
            shutdown,
            stats,
            call_timeout,
        }
    }

    /// Index of this worker, starting at 0
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn input(&self) -> &JsonValue {
        &self.input
    }

    pub fn intake(&self) -> &ResultIntake {
        &self.intake
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once the generator is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Whether the generator is paused; workers should idle while it is
    pub fn is_paused(&self) -> bool {
        self.stats.is_paused()
    }

    /// Push a result into the intake
    pub async fn push(&self, result: CallResult) -> bool {
        self.intake.push(result).await
    }

    /// Run one call bounded by the call timeout and push its outcome.
    ///
    /// A call that does not finish in time is dropped and a timeout result
    /// is pushed instead. Returns whether the call completed.
    pub async fn timed<F>(&self, call: F) -> bool
    where
        F: Future<Output = CallResult> + Send,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(mut result) => {
                result.started_at.get_or_insert(started_at);
                if result.duration.is_zero() {
                    result.duration = start.elapsed();
                }
                self.push(result).await;
                true
            }
            Err(_) => {
                self.push(CallResult::timed_out(start.elapsed()).started_at(started_at))
                    .await;
                false
            }
        }
    }
}
