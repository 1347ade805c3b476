//! Work dispatch
//!
//! Rate mode spawns one timeout-bounded task per permit so a slow call never
//! holds up the permit stream. Concurrency mode starts persistent workers and
//! only ever grows the pool; workers push into a shared intake that a single
//! collector drains into the aggregator.

use chrono::Utc;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use volley_config::RunSettings;
use volley_core::{
    CallResult, OneShotCall, PersistentWorker, ResultIntake, SharedInput, Stats, WorkerContext,
    WorkloadError, ERR_CALL_PANICKED,
};

use crate::aggregator::Aggregator;
use crate::lifecycle::Lifecycle;
use crate::pacer::Pacer;

/// State shared by every task of one run
pub(crate) struct RunContext {
    pub settings: RunSettings,
    pub input: SharedInput,
    pub stats: Arc<Stats>,
    pub aggregator: Arc<Aggregator>,
    pub lifecycle: Arc<Lifecycle>,
    pub span: Span,
}

/// Issue one call per permit until cancelled. Permits granted while paused
/// are dropped.
pub(crate) async fn dispatch_calls(run: Arc<RunContext>, mut pacer: Pacer, call: Arc<dyn OneShotCall>) {
    let shutdown = run.lifecycle.shutdown_token().clone();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = pacer.permit() => {}
        }
        if run.stats.is_paused() {
            continue;
        }
        spawn_call(&run, call.clone());
    }
    debug!("Call dispatcher stopped");
}

fn spawn_call(run: &Arc<RunContext>, call: Arc<dyn OneShotCall>) {
    let task_run = run.clone();
    let task = async move {
        let run = task_run;
        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = timeout(
            run.settings.call_timeout,
            AssertUnwindSafe(call.call(&run.input)).catch_unwind(),
        )
        .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(mut result)) => {
                result.started_at = Some(started_at);
                result.finished_at = Some(Utc::now());
                result.duration = elapsed;
                run.aggregator.record(result, false);
            }
            Ok(Err(_)) => {
                warn!("Load generator call panicked");
                let mut result = CallResult::failure(ERR_CALL_PANICKED).started_at(started_at);
                result.finished_at = Some(Utc::now());
                result.duration = elapsed;
                run.aggregator.record(result, false);
            }
            Err(_) => {
                let result = CallResult::timed_out(elapsed).started_at(started_at);
                run.aggregator.record(result, true);
            }
        }
    };
    run.lifecycle.tracker().spawn(task.instrument(run.span.clone()));
}

/// Start the initial workers and grow the pool on every stage until
/// cancelled. Workers are never stopped individually.
pub(crate) async fn dispatch_workers(
    run: Arc<RunContext>,
    mut pacer: Pacer,
    worker: Arc<dyn PersistentWorker>,
    intake: ResultIntake,
) {
    let shutdown = run.lifecycle.shutdown_token().clone();
    let mut workers = 0;
    let initial = pacer.current();
    while workers < initial {
        spawn_worker(&run, &worker, &intake, workers);
        workers += 1;
    }
    info!(workers, "Workers started");

    loop {
        let target = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            target = pacer.next_target() => target,
        };
        while workers < target {
            spawn_worker(&run, &worker, &intake, workers);
            workers += 1;
        }
        debug!(workers, "Worker pool grown");
    }
    debug!(workers, "Worker dispatcher stopped");
}

fn spawn_worker(
    run: &Arc<RunContext>,
    worker: &Arc<dyn PersistentWorker>,
    intake: &ResultIntake,
    id: u64,
) {
    let ctx = WorkerContext::new(
        id,
        run.input.clone(),
        intake.clone(),
        run.lifecycle.shutdown_token().clone(),
        run.stats.clone(),
        run.settings.call_timeout,
    );
    let worker = worker.clone();
    let setup_timeout = run.settings.setup_timeout;
    let teardown_timeout = run.settings.teardown_timeout;

    let task = async move {
        if !guard_hook(Hook::Setup, setup_timeout, &ctx, worker.setup(&ctx)).await {
            return;
        }
        debug!("Worker running");
        if AssertUnwindSafe(worker.run(ctx.clone()))
            .catch_unwind()
            .await
            .is_err()
        {
            warn!("Persistent worker panicked");
            ctx.push(CallResult::failure(ERR_CALL_PANICKED)).await;
        }
        guard_hook(Hook::Teardown, teardown_timeout, &ctx, worker.teardown(&ctx)).await;
        debug!("Worker finished");
    };
    let span = info_span!(parent: &run.span, "worker", id);
    run.lifecycle.tracker().spawn(task.instrument(span));
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Setup,
    Teardown,
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hook::Setup => write!(f, "setup"),
            Hook::Teardown => write!(f, "teardown"),
        }
    }
}

/// Run a worker hook under its timeout. A failed or timed-out hook is
/// pushed as a failed result; returns whether the hook succeeded.
async fn guard_hook<F>(hook: Hook, limit: Duration, ctx: &WorkerContext, fut: F) -> bool
where
    F: Future<Output = Result<(), WorkloadError>>,
{
    let started_at = Utc::now();
    let start = Instant::now();
    let error = match timeout(limit, fut).await {
        Ok(Ok(())) => return true,
        Ok(Err(err)) => format!("generator request {hook} error: {err}"),
        Err(_) => format!("generator request {hook} timeout"),
    };
    warn!(%hook, %error, "Worker hook failed");
    let mut result = CallResult::failure(error).started_at(started_at);
    result.duration = start.elapsed();
    ctx.push(result).await;
    false
}

/// Drain the worker intake into the aggregator until every sender is gone
pub(crate) async fn collect_results(mut intake: mpsc::Receiver<CallResult>, aggregator: Arc<Aggregator>) {
    while let Some(mut result) = intake.recv().await {
        let finished_at = *result.finished_at.get_or_insert_with(Utc::now);
        if result.duration.is_zero() {
            if let Some(started_at) = result.started_at {
                result.duration = (finished_at - started_at).to_std().unwrap_or_default();
            }
        }
        aggregator.record(result, false);
    }
    debug!("Result intake drained");
}
