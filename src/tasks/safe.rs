//! # Panic-containing task decorator.
//!
//! [`SafeTask`] runs the wrapped task's `commit`/`rollback` under
//! `catch_unwind`. A panic is converted into [`TaskError::Panicked`] carrying
//! the panic message and a captured stack trace; the calling task keeps running.
//!
//! ```text
//! SafeTask::commit ──► AssertUnwindSafe(inner.commit(ctx)).catch_unwind()
//!                        ├─ Ok(res)    ─► res
//!                        └─ Err(panic) ─► Err(Panicked { cause, trace })
//! ```
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if the task uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::policies::Policy;
use crate::tasks::task::{Task, TaskRef};

/// Decorator turning panics of the inner task into errors.
pub struct SafeTask {
    inner: TaskRef,
}

impl SafeTask {
    /// Wraps `inner`.
    pub fn new(inner: TaskRef) -> Self {
        Self { inner }
    }

    /// Wraps `inner` and returns a shared handle.
    pub fn arc(inner: TaskRef) -> Arc<Self> {
        Arc::new(Self::new(inner))
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Converts a panic payload into [`TaskError::Panicked`].
pub(crate) fn panicked(payload: &(dyn Any + Send)) -> TaskError {
    TaskError::Panicked {
        cause: panic_message(payload),
        trace: Backtrace::force_capture().to_string(),
    }
}

#[async_trait]
impl Task for SafeTask {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn policy(&self) -> Option<Policy> {
        self.inner.policy()
    }

    async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        match AssertUnwindSafe(self.inner.commit(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(panicked(payload.as_ref())),
        }
    }

    async fn rollback(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        match AssertUnwindSafe(self.inner.rollback(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(panicked(payload.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskFn;

    fn exploding() -> TaskRef {
        TaskFn::arc(
            "boom",
            |_ctx: CancellationToken| async {
                if true {
                    panic!("commit exploded");
                }
                Ok(())
            },
            |_ctx: CancellationToken| async {
                if true {
                    panic!("{}", String::from("rollback exploded"));
                }
                Ok(())
            },
        )
    }

    #[tokio::test]
    async fn test_commit_panic_becomes_error() {
        let safe = SafeTask::new(exploding());
        let err = safe
            .commit(CancellationToken::new())
            .await
            .expect_err("panic must surface as error");
        match err {
            TaskError::Panicked { cause, .. } => assert_eq!(cause, "commit exploded"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rollback_panic_becomes_error() {
        let safe = SafeTask::new(exploding());
        let err = safe.rollback(CancellationToken::new()).await.expect_err("panic");
        assert_eq!(err.as_label(), "task_panicked");
        assert!(err.to_string().contains("rollback exploded"));
    }

    #[tokio::test]
    async fn test_passes_through_normal_results() {
        let inner: TaskRef = TaskFn::arc(
            "ok",
            |_ctx: CancellationToken| async { Ok(()) },
            |_ctx: CancellationToken| async { Err(TaskError::fail("nope")) },
        );
        let safe = SafeTask::new(inner);
        assert_eq!(safe.name(), "ok");
        assert!(safe.commit(CancellationToken::new()).await.is_ok());
        assert_eq!(
            safe.rollback(CancellationToken::new()).await,
            Err(TaskError::fail("nope"))
        );
    }
}
