//! Mock workloads shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use volley_core::{CallResult, OneShotCall, PersistentWorker, WorkerContext, WorkloadError};

pub const SUCCESS_DATA: &str = "successCallData";
pub const FAILED_DATA: &str = "failedCallData";

/// One-shot call that sleeps, then succeeds or fails
pub struct MockGun {
    call_sleep: Duration,
    fail: bool,
    calls: AtomicU64,
}

impl MockGun {
    pub fn new(call_sleep: Duration) -> Self {
        Self {
            call_sleep,
            fail: false,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing(call_sleep: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(call_sleep)
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OneShotCall for MockGun {
    async fn call(&self, _input: &JsonValue) -> CallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.call_sleep).await;
        if self.fail {
            CallResult::failure("error").with_data(FAILED_DATA)
        } else {
            CallResult::ok(SUCCESS_DATA)
        }
    }
}

/// One-shot call that echoes the shared input
pub struct EchoGun;

#[async_trait]
impl OneShotCall for EchoGun {
    async fn call(&self, input: &JsonValue) -> CallResult {
        CallResult::ok(input.clone())
    }
}

/// One-shot call that panics
pub struct PanickingGun;

#[async_trait]
impl OneShotCall for PanickingGun {
    async fn call(&self, _input: &JsonValue) -> CallResult {
        panic!("gun jammed");
    }
}

/// Persistent worker issuing timed calls back to back
#[derive(Default)]
pub struct MockWorker {
    pub call_sleep: Duration,
    pub fail_setup: bool,
    pub setups: AtomicU64,
    pub teardowns: AtomicU64,
}

impl MockWorker {
    pub fn new(call_sleep: Duration) -> Self {
        Self {
            call_sleep,
            ..Default::default()
        }
    }

    pub fn setups(&self) -> u64 {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> u64 {
        self.teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistentWorker for MockWorker {
    async fn setup(&self, _ctx: &WorkerContext) -> Result<(), WorkloadError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup {
            return Err(WorkloadError::Failed("no connection".to_string()));
        }
        Ok(())
    }

    async fn run(&self, ctx: WorkerContext) {
        while !ctx.is_cancelled() {
            if ctx.is_paused() {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = sleep(Duration::from_millis(10)) => continue,
                }
            }
            let call_sleep = self.call_sleep;
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = ctx.timed(async move {
                    sleep(call_sleep).await;
                    CallResult::ok(SUCCESS_DATA)
                }) => {}
            }
        }
    }

    async fn teardown(&self, _ctx: &WorkerContext) -> Result<(), WorkloadError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
