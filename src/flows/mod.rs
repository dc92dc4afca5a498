//! # Flow composition.
//!
//! A flow composes member [`Task`](crate::Task)s into one unit and runs each
//! member through an [`Executor`] with the flow's policy.
//!
//! - [`SequentialFlow`] commits members in order and compensates in reverse.
//! - [`ConcurrentFlow`] commits members on independent workers; the first
//!   failure cancels the siblings that have not started yet.
//! - [`FlowBuilder`] assembles either from a [`Config`](crate::Config).
//!
//! Both flows implement [`Task`](crate::Task) (`commit` = run, `rollback` =
//! compensation pass), so they nest into each other.
//!
//! ## Rules
//! - One `run`/`compensate` call completes before another starts on the same
//!   flow (a gate is held for the whole call).
//! - Compensation only touches members whose commit was attempted, and never
//!   the failing member (its executor already rolled it back).
//! - A member failing under [`Policy::RevertAll`](crate::Policy::RevertAll)
//!   makes the flow compensate every attempted member before `run` returns.

mod builder;
mod concurrent;
mod sequential;

pub use builder::FlowBuilder;
pub use concurrent::ConcurrentFlow;
pub use sequential::SequentialFlow;

use tokio::sync::Mutex as Gate;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::{Executor, Info, State},
    error::TaskError,
    events::{CallbackRef, Event, EventKind, NotifierRef, trigger_all},
    policies::{BackoffPolicy, Policy},
    tasks::TaskRef,
};

/// Settings and identity shared by both flow kinds.
struct FlowCore {
    name: String,
    info: Info,
    policy: Policy,
    backoff: BackoffPolicy,
    notifier: NotifierRef,
    callbacks: Vec<CallbackRef>,
    tasks: Vec<TaskRef>,
    gate: Gate<()>,
}

impl FlowCore {
    fn new(kind: &str, config: Config) -> Self {
        let backoff = config.backoff();
        let info = Info::new(kind).named(config.name);
        Self {
            name: info.name(),
            info,
            policy: config.policy,
            backoff,
            notifier: config.notifier,
            callbacks: config.callbacks,
            tasks: config.tasks,
            gate: Gate::new(()),
        }
    }

    fn executor(&self, task: TaskRef, policy: Policy) -> Executor {
        Executor::new(task, policy)
            .with_backoff(self.backoff)
            .with_notifier(self.notifier.clone())
    }

    /// Marks the flow running and reports it.
    async fn start(&self, ctx: &CancellationToken, scoped: &[CallbackRef]) {
        self.info.set_state(State::Running);
        self.report(ctx, scoped, None).await;
    }

    /// Records the outcome of a call and reports it.
    async fn finish(
        &self,
        ctx: &CancellationToken,
        scoped: &[CallbackRef],
        res: Result<(), TaskError>,
    ) -> Result<(), TaskError> {
        self.info.add_error(res.clone().err(), true);
        self.report(ctx, scoped, res.as_ref().err()).await;
        res
    }

    async fn report(&self, ctx: &CancellationToken, scoped: &[CallbackRef], err: Option<&TaskError>) {
        let snapshot = self.info.snapshot();
        trigger_all(&self.callbacks, scoped, ctx, &snapshot, &(), err).await;
    }
}

async fn compensate_one(
    ctx: &CancellationToken,
    task: &TaskRef,
    notifier: &NotifierRef,
) -> Option<TaskError> {
    match task.rollback(ctx.clone()).await {
        Ok(()) => {
            notifier.event(
                ctx,
                &Event::new(EventKind::RollbackCompleted).with_task(task.name()),
            );
            None
        }
        Err(e) => {
            tracing::warn!(task = task.name(), error = %e, "compensation failed");
            notifier.event(
                ctx,
                &Event::new(EventKind::RollbackFailed)
                    .with_task(task.name())
                    .with_reason(e.to_string()),
            );
            Some(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording tasks shared by flow tests.

    use std::sync::{Arc, Mutex};

    use tokio_util::sync::CancellationToken;

    use crate::error::TaskError;
    use crate::policies::Policy;
    use crate::tasks::{TaskFn, TaskRef};

    /// Ordered log of `"commit:<name>"` / `"rollback:<name>"` entries.
    #[derive(Clone, Default)]
    pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        pub(crate) fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        pub(crate) fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        pub(crate) fn with_prefix(&self, prefix: &str) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter(|e| e.starts_with(prefix))
                .collect()
        }

        pub(crate) fn task(&self, name: &'static str, fail: Option<&'static str>) -> TaskRef {
            self.build(name, fail, None)
        }

        pub(crate) fn task_with_policy(
            &self,
            name: &'static str,
            fail: Option<&'static str>,
            policy: Policy,
        ) -> TaskRef {
            self.build(name, fail, Some(policy))
        }

        fn build(&self, name: &'static str, fail: Option<&'static str>, policy: Option<Policy>) -> TaskRef {
            let (c, r) = (self.clone(), self.clone());
            let task = TaskFn::new(
                name,
                move |_ctx: CancellationToken| {
                    let c = c.clone();
                    async move {
                        c.push(format!("commit:{name}"));
                        match fail {
                            Some(msg) => Err(TaskError::fail(msg)),
                            None => Ok(()),
                        }
                    }
                },
                move |_ctx: CancellationToken| {
                    let r = r.clone();
                    async move {
                        r.push(format!("rollback:{name}"));
                        Ok(())
                    }
                },
            );
            match policy {
                Some(p) => Arc::new(task.with_policy(p)),
                None => Arc::new(task),
            }
        }
    }
}
