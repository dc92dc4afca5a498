//! # Retrying task decorator.
//!
//! [`RetryTask`] re-invokes the inner task's `commit` with the bounded
//! backoff of [`BackoffPolicy`] until it succeeds, the attempts are used up, or
//! the context is cancelled. Unlike the [`Executor`](crate::Executor) it never
//! rolls back on its own: compensation is left to whoever drives the task.
//!
//! ```text
//! commit ──► Err(e0) ──► sleep(d1) ──► commit ──► Err(e1) ──► ... ──► Err(e0 ⊕ e1 ⊕ ...)
//!                 └─ ctx cancelled during sleep ─────────────────────► Err(Canceled)
//! ```
//!
//! Every failed attempt is kept in the returned aggregate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::policies::{BackoffPolicy, Policy};
use crate::tasks::task::{Task, TaskRef};

/// Decorator retrying `commit` of the inner task.
pub struct RetryTask {
    inner: TaskRef,
    backoff: BackoffPolicy,
}

impl RetryTask {
    /// Wraps `inner` with the given retry budget.
    pub fn new(inner: TaskRef, backoff: BackoffPolicy) -> Self {
        Self { inner, backoff }
    }

    /// Wraps `inner` and returns a shared handle.
    pub fn arc(inner: TaskRef, backoff: BackoffPolicy) -> Arc<Self> {
        Arc::new(Self::new(inner, backoff))
    }
}

#[async_trait]
impl Task for RetryTask {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn policy(&self) -> Option<Policy> {
        self.inner.policy()
    }

    async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let mut err = match self.inner.commit(ctx.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        let mut delays = self.backoff.generator();

        for _ in 0..self.backoff.attempts {
            if !err.is_retryable() {
                break;
            }
            let delay = delays.next().unwrap_or_default();
            select! {
                _ = time::sleep(delay) => {}
                _ = ctx.cancelled() => return Err(TaskError::Canceled),
            }
            match self.inner.commit(ctx.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => err = err.merge(e),
            }
        }
        Err(err)
    }

    async fn rollback(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        self.inner.rollback(ctx).await
    }
}
