//! # Concurrent flow.
//!
//! Every member is dispatched on its own worker under a child token of the
//! caller's context. The first failure is captured exactly once and cancels
//! the child token; members that have not started yet see it and skip their
//! commit, members already running finish normally.
//!
//! ```text
//! run:
//!   child = ctx.child_token()
//!   ├─► worker 0: child cancelled? skip : executed += 0, Executor::run
//!   ├─► worker 1: ...
//!   └─► worker n: ...
//!   join all ─► child.cancel() ─► first captured error
//!
//! compensate:
//!   rollback every executed member concurrently (except the failed ones,
//!   already rolled back by their executors) ─► aggregated errors
//! ```
//!
//! Dispatch order among siblings is not guaranteed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{FirstError, Info, State},
    error::TaskError,
    events::CallbackRef,
    flows::{FlowCore, compensate_one},
    policies::Policy,
    tasks::{Task, TaskRef, panicked},
};

#[derive(Debug, Default)]
struct Ledger {
    /// Members whose commit was dispatched.
    executed: Vec<usize>,
    /// Members already rolled back by their executors.
    failed: Vec<usize>,
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unordered composition of tasks running in parallel.
pub struct ConcurrentFlow {
    core: FlowCore,
    ledger: Arc<Mutex<Ledger>>,
}

impl ConcurrentFlow {
    /// Creates a flow from `config`; members come from `config.tasks`.
    pub fn new(config: Config) -> Self {
        Self {
            core: FlowCore::new("concurrent-flow", config),
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// Flow metadata and state.
    pub fn info(&self) -> &Info {
        &self.core.info
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.core.info.state()
    }

    /// Members in declaration order.
    pub fn tasks(&self) -> &[TaskRef] {
        &self.core.tasks
    }

    /// Indices of members whose commit was dispatched and not yet compensated.
    pub fn executed(&self) -> Vec<usize> {
        let mut executed = lock(&self.ledger).executed.clone();
        executed.sort_unstable();
        executed
    }

    /// Runs every member concurrently.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<(), TaskError> {
        self.run_with(ctx, &[]).await
    }

    /// Same as [`run`](Self::run) with call-scoped callbacks.
    pub async fn run_with(
        &self,
        ctx: &CancellationToken,
        callbacks: &[CallbackRef],
    ) -> Result<(), TaskError> {
        let _gate = self.core.gate.lock().await;
        self.core.start(ctx, callbacks).await;
        *lock(&self.ledger) = Ledger::default();

        let res = self.commit_all(ctx).await;
        self.core.finish(ctx, callbacks, res).await
    }

    async fn commit_all(&self, ctx: &CancellationToken) -> Result<(), TaskError> {
        let child = ctx.child_token();
        let first = Arc::new(FirstError::new(child.clone()));
        let mut workers = JoinSet::new();

        for (idx, task) in self.core.tasks.iter().enumerate() {
            let policy = self.core.policy.resolve(task.policy(), false);
            let exec = self.core.executor(task.clone(), policy);
            let (child, first, ledger) = (child.clone(), first.clone(), self.ledger.clone());

            workers.spawn(async move {
                if child.is_cancelled() {
                    return false;
                }
                lock(&ledger).executed.push(idx);
                match exec.run(&child).await {
                    Ok(()) => false,
                    Err(err) => {
                        lock(&ledger).failed.push(idx);
                        first.capture(err);
                        policy == Policy::RevertAll
                    }
                }
            });
        }

        let mut revert_all = false;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(escalate) => revert_all |= escalate,
                Err(e) if e.is_panic() => {
                    let payload = e.into_panic();
                    first.capture(panicked(payload.as_ref()));
                }
                Err(_) => {
                    first.capture(TaskError::Canceled);
                }
            }
        }
        child.cancel();

        let err = match first.get() {
            Some(err) => err.clone(),
            None => {
                let dispatched = lock(&self.ledger).executed.len();
                if ctx.is_cancelled() && dispatched < self.core.tasks.len() {
                    TaskError::Canceled
                } else {
                    return Ok(());
                }
            }
        };
        if revert_all {
            if let Some(rb) = self.unwind(ctx).await {
                return Err(err.merge(rb));
            }
        }
        Err(err)
    }

    /// Rolls back every dispatched member concurrently.
    pub async fn compensate(&self, ctx: &CancellationToken) -> Result<(), TaskError> {
        self.compensate_with(ctx, &[]).await
    }

    /// Same as [`compensate`](Self::compensate) with call-scoped callbacks.
    pub async fn compensate_with(
        &self,
        ctx: &CancellationToken,
        callbacks: &[CallbackRef],
    ) -> Result<(), TaskError> {
        let _gate = self.core.gate.lock().await;
        self.core.start(ctx, callbacks).await;
        let res = match self.unwind(ctx).await {
            Some(err) => Err(err),
            None => Ok(()),
        };
        self.core.finish(ctx, callbacks, res).await
    }

    async fn unwind(&self, ctx: &CancellationToken) -> Option<TaskError> {
        let Ledger { executed, failed } = std::mem::take(&mut *lock(&self.ledger));

        let mut workers = JoinSet::new();
        for idx in executed.into_iter().filter(|idx| !failed.contains(idx)) {
            let task = self.core.tasks[idx].clone();
            let notifier = self.core.notifier.clone();
            let ctx = ctx.clone();
            workers.spawn(async move { compensate_one(&ctx, &task, &notifier).await });
        }

        let mut errors = None;
        while let Some(joined) = workers.join_next().await {
            let err = match joined {
                Ok(err) => err,
                Err(e) if e.is_panic() => Some(panicked(e.into_panic().as_ref())),
                Err(_) => Some(TaskError::Canceled),
            };
            errors = TaskError::combine(errors, err);
        }
        errors
    }
}

#[async_trait]
impl Task for ConcurrentFlow {
    fn name(&self) -> &str {
        &self.core.name
    }

    async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        self.run(&ctx).await
    }

    async fn rollback(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        self.compensate(&ctx).await
    }
}
