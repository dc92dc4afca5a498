//! # Sequential flow.
//!
//! Members commit strictly in order; the first failure stops the flow.
//!
//! ```text
//! run:        T0 ─► T1 ─► ... ─► Tk ✗        (Tk+1.. never run)
//!                               └─ executor rolls back Tk
//! compensate: Tk-1 ─► ... ─► T0              (reverse, errors aggregated)
//! ```
//!
//! The ledger keeps the highest index whose commit was attempted and the index
//! of the failing member. A compensation pass walks from the former down to 0,
//! skipping the latter, then clears the ledger.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{Info, State},
    error::TaskError,
    events::CallbackRef,
    flows::{FlowCore, compensate_one},
    policies::Policy,
    tasks::{Task, TaskRef},
};

#[derive(Debug, Default)]
struct Ledger {
    /// Highest index whose commit was attempted.
    cursor: Option<usize>,
    /// Member already rolled back by its executor.
    failed: Option<usize>,
}

/// Ordered composition of tasks.
pub struct SequentialFlow {
    core: FlowCore,
    ledger: Mutex<Ledger>,
}

impl SequentialFlow {
    /// Creates a flow from `config`; members come from `config.tasks`.
    pub fn new(config: Config) -> Self {
        Self {
            core: FlowCore::new("sequential-flow", config),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flow metadata and state.
    pub fn info(&self) -> &Info {
        &self.core.info
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.core.info.state()
    }

    /// Members in commit order.
    pub fn tasks(&self) -> &[TaskRef] {
        &self.core.tasks
    }

    /// Highest member index whose commit was attempted and not yet compensated.
    pub fn cursor(&self) -> Option<usize> {
        self.ledger().cursor
    }

    /// Runs every member in order.
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
        *self.ledger() = Ledger::default();

        let res = self.commit_all(ctx).await;
        self.core.finish(ctx, callbacks, res).await
    }

    async fn commit_all(&self, ctx: &CancellationToken) -> Result<(), TaskError> {
        let mut escalated = false;

        for (idx, task) in self.core.tasks.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            let policy = self.core.policy.resolve(task.policy(), escalated);
            escalated = policy == Policy::RevertAll;
            self.ledger().cursor = Some(idx);

            let exec = self.core.executor(task.clone(), policy);
            if let Err(err) = exec.run(ctx).await {
                self.ledger().failed = Some(idx);
                if policy == Policy::RevertAll {
                    return Err(match self.unwind(ctx).await {
                        Some(rb) => err.merge(rb),
                        None => err,
                    });
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Compensates attempted members in reverse order.
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
        let Ledger { cursor, failed } = std::mem::take(&mut *self.ledger());
        let Some(cursor) = cursor else {
            return None;
        };

        let mut errors = None;
        for idx in (0..=cursor).rev() {
            if Some(idx) == failed {
                continue;
            }
            let rb = compensate_one(ctx, &self.core.tasks[idx], &self.core.notifier).await;
            errors = TaskError::combine(errors, rb);
        }
        errors
    }
}

#[async_trait]
impl Task for SequentialFlow {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::Journal;
    use crate::events::Callback;
    use crate::core::InfoSnapshot;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failure_stops_and_compensates_in_reverse() {
        let journal = Journal::default();
        let flow = SequentialFlow::new(Config::new(Policy::Revert).with_tasks([
            journal.task("t1", None),
            journal.task("t2", None),
            journal.task("t3", Some("boom")),
            journal.task("t4", None),
        ]));
        let ctx = CancellationToken::new();

        let err = flow.run(&ctx).await.expect_err("t3 fails");
        assert_eq!(err, TaskError::fail("boom"));
        assert_eq!(flow.cursor(), Some(2));
        assert_eq!(flow.state(), State::Error);

        assert!(flow.compensate(&ctx).await.is_ok());
        assert_eq!(
            journal.entries(),
            vec![
                "commit:t1",
                "commit:t2",
                "commit:t3",
                "rollback:t3",
                "rollback:t2",
                "rollback:t1",
            ]
        );
        assert_eq!(flow.cursor(), None);

        // second pass has nothing left to undo
        assert!(flow.compensate(&ctx).await.is_ok());
        assert_eq!(journal.with_prefix("rollback:").len(), 3);
    }

    #[tokio::test]
    async fn test_revert_all_compensates_inside_run() {
        let journal = Journal::default();
        let flow = SequentialFlow::new(Config::new(Policy::Revert).with_tasks([
            journal.task("a", None),
            journal.task_with_policy("b", None, Policy::RevertAll),
            journal.task("c", Some("x")),
        ]));
        let ctx = CancellationToken::new();

        // "c" inherits RevertAll from "b"
        assert_eq!(flow.run(&ctx).await, Err(TaskError::fail("x")));
        assert_eq!(
            journal.with_prefix("rollback:"),
            vec!["rollback:c", "rollback:b", "rollback:a"]
        );
        assert!(flow.compensate(&ctx).await.is_ok());
        assert_eq!(journal.with_prefix("rollback:").len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_dispatch() {
        let journal = Journal::default();
        let flow = SequentialFlow::new(
            Config::new(Policy::Revert).with_tasks([journal.task("a", None), journal.task("b", None)]),
        );
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(flow.run(&ctx).await, Err(TaskError::Canceled));
        assert!(journal.entries().is_empty());
        assert_eq!(flow.cursor(), None);
    }

    #[tokio::test]
    async fn test_success_then_compensation_undoes_everything() {
        let journal = Journal::default();
        let flow = SequentialFlow::new(
            Config::new(Policy::Retry).with_tasks([journal.task("a", None), journal.task("b", None)]),
        );
        let ctx = CancellationToken::new();

        assert!(flow.run(&ctx).await.is_ok());
        assert_eq!(flow.state(), State::Success);
        assert!(flow.compensate(&ctx).await.is_ok());
        assert_eq!(
            journal.with_prefix("rollback:"),
            vec!["rollback:b", "rollback:a"]
        );
    }

    struct States(std::sync::Mutex<Vec<State>>);

    #[async_trait]
    impl Callback for States {
        async fn trigger(
            &self,
            _ctx: &CancellationToken,
            info: &InfoSnapshot,
            _input: &(),
            _err: Option<&TaskError>,
        ) {
            self.0.lock().unwrap().push(info.state);
        }
    }

    #[tokio::test]
    async fn test_callbacks_see_transitions() {
        let journal = Journal::default();
        let instance = Arc::new(States(Default::default()));
        let scoped = Arc::new(States(Default::default()));
        let flow = SequentialFlow::new(
            Config::new(Policy::Revert)
                .with_name("orders")
                .with_callback(instance.clone())
                .with_tasks([journal.task("a", Some("no"))]),
        );

        let _ = flow
            .run_with(&CancellationToken::new(), &[scoped.clone() as CallbackRef])
            .await;
        assert_eq!(flow.name(), "orders");
        assert_eq!(*instance.0.lock().unwrap(), vec![State::Running, State::Error]);
        assert_eq!(*scoped.0.lock().unwrap(), vec![State::Running, State::Error]);
    }
}
