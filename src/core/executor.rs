//! # Executor: one task under one policy.
//!
//! Runs a single [`Task`] through the commit / retry / rollback state machine
//! and reports every step to a [`Notifier`].
//!
//! ## Flow
//! ```text
//! TaskStarting, notify 0%
//!   └─► commit ──► Ok ──► TaskCompleted, notify 100% ──► Ok(())
//!         │
//!         └─ Err ─► CommitFailed
//!               ├─ Policy::Retry:
//!               │    loop n in 1..=attempts {
//!               │      ctx cancelled?  ─► err = Canceled, break
//!               │      RetryScheduled ─► sleep(delay_n) | ctx cancelled ─► err = Canceled, break
//!               │      commit ─► Ok ─► TaskCompleted ─► Ok(())
//!               │             └─ Err ─► CommitFailed (attempt n), stop if it carries a cancellation
//!               │    }
//!               └─► rollback (once) ─► RollbackCompleted | RollbackFailed, notify 0%
//!                                    ─► Err(err ⊕ rollback_err)
//! ```
//!
//! ## Rules
//! - The first commit always runs, even on an already-cancelled context.
//! - Cancellation aborts the retry wait immediately; rollback still runs.
//! - Every other failure is retried, captured panics and aggregates included.
//! - The failure is always surfaced; a failed rollback is combined with it.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::info::{Info, State},
    error::TaskError,
    events::{Event, EventKind, NoopNotifier, NotifierRef},
    policies::{BackoffPolicy, Policy},
    tasks::TaskRef,
};

/// Drives one task through commit, retries and compensation.
pub struct Executor {
    task: TaskRef,
    notifier: NotifierRef,
    policy: Policy,
    backoff: BackoffPolicy,
    info: Info,
}

impl Executor {
    /// Creates an executor with default backoff and a no-op notifier.
    pub fn new(task: TaskRef, policy: Policy) -> Self {
        let info = Info::new("executor").named(Some(task.name().to_string()));
        Self {
            task,
            notifier: NoopNotifier::arc(),
            policy,
            backoff: BackoffPolicy::default(),
            info,
        }
    }

    /// Sets the event sink.
    pub fn with_notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets retry cap and base interval at once.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the retry cap.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.backoff.attempts = attempts;
        self
    }

    /// Sets the base backoff interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.backoff.interval = interval;
        self
    }

    /// Executor metadata and state.
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.info.state()
    }

    /// Policy this executor applies.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Runs the task to completion or compensation.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<(), TaskError> {
        let name = self.task.name();
        self.info.set_state(State::Running);
        self.notifier
            .event(ctx, &Event::new(EventKind::TaskStarting).with_task(name));
        self.notifier.notify(ctx, name, 0.0);

        let err = match self.task.commit(ctx.clone()).await {
            Ok(()) => {
                self.complete(ctx);
                return Ok(());
            }
            Err(e) => e,
        };
        self.commit_failed(ctx, &err, 0);

        let err = if self.policy.retries() {
            match self.retry(ctx, err).await {
                Ok(()) => {
                    self.complete(ctx);
                    return Ok(());
                }
                Err(e) => e,
            }
        } else {
            err
        };

        let rollback = self.task.rollback(ctx.clone()).await;
        match &rollback {
            Ok(()) => self
                .notifier
                .event(ctx, &Event::new(EventKind::RollbackCompleted).with_task(name)),
            Err(rb) => {
                tracing::warn!(task = name, error = %rb, "rollback failed");
                self.notifier.event(
                    ctx,
                    &Event::new(EventKind::RollbackFailed)
                        .with_task(name)
                        .with_reason(rb.to_string()),
                );
            }
        }
        self.notifier.notify(ctx, name, 0.0);

        let err = match rollback {
            Ok(()) => err,
            Err(rb) => err.merge(rb),
        };
        self.info.add_error(Some(err.clone()), true);
        Err(err)
    }

    async fn retry(&self, ctx: &CancellationToken, mut err: TaskError) -> Result<(), TaskError> {
        let name = self.task.name();
        let mut delays = self.backoff.generator();

        for attempt in 1..=self.backoff.attempts {
            if !err.is_retryable() {
                break;
            }
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            let delay = delays.next().unwrap_or_default();
            tracing::debug!(task = name, attempt, ?delay, "retry scheduled");
            self.notifier.event(
                ctx,
                &Event::new(EventKind::RetryScheduled)
                    .with_task(name)
                    .with_attempt(attempt)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
            }

            match self.task.commit(ctx.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.commit_failed(ctx, &e, attempt);
                    err = e;
                }
            }
        }
        Err(err)
    }

    fn complete(&self, ctx: &CancellationToken) {
        let name = self.task.name();
        self.info.set_state(State::Success);
        self.notifier
            .event(ctx, &Event::new(EventKind::TaskCompleted).with_task(name));
        self.notifier.notify(ctx, name, 100.0);
    }

    fn commit_failed(&self, ctx: &CancellationToken, err: &TaskError, attempt: u32) {
        self.notifier.event(
            ctx,
            &Event::new(EventKind::CommitFailed)
                .with_task(self.task.name())
                .with_attempt(attempt)
                .with_reason(err.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, Signal};
    use crate::tasks::TaskFn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::broadcast;

    struct Counters {
        commits: Arc<AtomicU32>,
        rollbacks: Arc<AtomicU32>,
    }

    fn counted(fail_times: u32, rollback_err: Option<&'static str>) -> (TaskRef, Counters) {
        let commits = Arc::new(AtomicU32::new(0));
        let rollbacks = Arc::new(AtomicU32::new(0));
        let (c, r) = (commits.clone(), rollbacks.clone());
        let task = TaskFn::arc(
            "counted",
            move |_ctx: CancellationToken| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < fail_times {
                        Err(TaskError::fail("x"))
                    } else {
                        Ok(())
                    }
                }
            },
            move |_ctx: CancellationToken| {
                let r = r.clone();
                async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    match rollback_err {
                        Some(msg) => Err(TaskError::fail(msg)),
                        None => Ok(()),
                    }
                }
            },
        );
        (task, Counters { commits, rollbacks })
    }

    fn drain(rx: &mut broadcast::Receiver<Signal>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            if let Some(ev) = signal.as_event() {
                kinds.push(ev.kind);
            }
        }
        kinds
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (task, calls) = counted(0, None);
        let bus = Arc::new(Bus::new(64));
        let mut rx = bus.subscribe();
        let exec = Executor::new(task, Policy::Revert).with_notifier(bus);

        assert!(exec.run(&CancellationToken::new()).await.is_ok());
        assert_eq!(exec.state(), State::Success);
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(
            drain(&mut rx),
            vec![EventKind::TaskStarting, EventKind::TaskCompleted]
        );
    }

    #[tokio::test]
    async fn test_revert_rolls_back_once_without_retry() {
        let (task, calls) = counted(u32::MAX, None);
        let exec = Executor::new(task, Policy::Revert).with_attempts(5);

        let err = exec.run(&CancellationToken::new()).await.expect_err("fails");
        assert_eq!(err, TaskError::fail("x"));
        assert_eq!(exec.state(), State::Error);
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers() {
        let (task, calls) = counted(2, None);
        let bus = Arc::new(Bus::new(64));
        let mut rx = bus.subscribe();
        let exec = Executor::new(task, Policy::Retry)
            .with_attempts(3)
            .with_interval(Duration::from_millis(10))
            .with_notifier(bus);

        assert!(exec.run(&CancellationToken::new()).await.is_ok());
        assert_eq!(calls.commits.load(Ordering::SeqCst), 3);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::TaskStarting,
                EventKind::CommitFailed,
                EventKind::RetryScheduled,
                EventKind::CommitFailed,
                EventKind::RetryScheduled,
                EventKind::TaskCompleted,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_combines_rollback_error() {
        let (task, calls) = counted(u32::MAX, Some("undo"));
        let exec = Executor::new(task, Policy::Retry)
            .with_attempts(2)
            .with_interval(Duration::from_millis(10));

        let err = exec.run(&CancellationToken::new()).await.expect_err("fails");
        assert_eq!(calls.commits.load(Ordering::SeqCst), 3);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(
            err.causes(),
            vec![&TaskError::fail("x"), &TaskError::fail("undo")]
        );
        assert_eq!(exec.info().error(), Some(err));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_reports_canceled_and_rolls_back() {
        let (task, calls) = counted(u32::MAX, None);
        let exec = Executor::new(task, Policy::Retry)
            .with_attempts(5)
            .with_interval(Duration::from_secs(30));
        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let err = exec.run(&ctx).await.expect_err("cancelled");
        assert_eq!(err, TaskError::Canceled);
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
    }

    fn failing_once(calls: Arc<AtomicU32>, err: fn() -> TaskError) -> TaskRef {
        TaskFn::arc(
            "flaky",
            move |_ctx: CancellationToken| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(err())
                    } else {
                        Ok(())
                    }
                }
            },
            |_ctx: CancellationToken| async { Ok(()) },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_captured_panic() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let task: TaskRef = crate::tasks::SafeTask::arc(TaskFn::arc(
            "explosive",
            move |_ctx: CancellationToken| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("first commit explodes");
                    }
                    Ok(())
                }
            },
            |_ctx: CancellationToken| async { Ok(()) },
        ));
        let exec = Executor::new(task, Policy::Retry)
            .with_attempts(3)
            .with_interval(Duration::from_millis(10));

        assert!(exec.run(&CancellationToken::new()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_aggregate_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let task = failing_once(calls.clone(), || {
            TaskError::fail("a").merge(TaskError::fail("b"))
        });
        let exec = Executor::new(task, Policy::Retry)
            .with_attempts(3)
            .with_interval(Duration::from_millis(10));

        assert!(exec.run(&CancellationToken::new()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_context_still_attempts_first_commit() {
        let (task, calls) = counted(u32::MAX, None);
        let exec = Executor::new(task, Policy::Retry).with_attempts(3);
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(exec.run(&ctx).await, Err(TaskError::Canceled));
        assert_eq!(calls.commits.load(Ordering::SeqCst), 1);
        assert_eq!(calls.rollbacks.load(Ordering::SeqCst), 1);
    }
}
