//! Run lifecycle
//!
//! Tracks the generator state machine and owns the cancellation token and
//! task tracker every spawned task hangs off.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use volley_core::{Stats, StopReason};

use crate::error::{EngineError, EngineResult};

/// Generator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Built, nothing running yet
    Created,
    /// Dispatching work
    Running,
    /// Cancelled, waiting for in-flight work
    Draining,
    /// Drained; results are final
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "created"),
            EngineState::Running => write!(f, "running"),
            EngineState::Draining => write!(f, "draining"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

pub(crate) struct Lifecycle {
    state: Mutex<EngineState>,
    started: AtomicBool,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    stats: Arc<Stats>,
}

impl Lifecycle {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            state: Mutex::new(EngineState::Created),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            stats,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Move to `Running`. Returns false when already running; `spawn` runs
    /// under the state lock so a concurrent cancel cannot slip in between.
    pub fn begin(&self, spawn: impl FnOnce()) -> EngineResult<bool> {
        let mut state = self.state.lock();
        match *state {
            EngineState::Created => {
                *state = EngineState::Running;
                self.started.store(true, Ordering::Release);
                spawn();
                Ok(true)
            }
            EngineState::Running => Ok(false),
            EngineState::Draining | EngineState::Stopped => Err(EngineError::Terminated),
        }
    }

    /// Cancel the run. The first reason is kept; returns whether this call
    /// moved the generator into `Draining`.
    pub fn cancel(&self, reason: StopReason) -> bool {
        let mut state = self.state.lock();
        let initiated = matches!(*state, EngineState::Created | EngineState::Running);
        if initiated {
            *state = EngineState::Draining;
            self.stats.mark_stopped(reason);
            info!(reason = %reason, "Stopping generator");
        }
        drop(state);
        self.shutdown.cancel();
        initiated
    }

    /// Cancel without recording a stop reason, as the first step of a
    /// drain. Returns whether a run was ever spawned.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if *state == EngineState::Created {
            *state = EngineState::Draining;
        }
        drop(state);
        self.shutdown.cancel();
        self.started.load(Ordering::Acquire)
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Wait until every tracked task returned
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn mark_terminated(&self) {
        *self.state.lock() = EngineState::Stopped;
    }
}
