//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps two closures `Fn(CancellationToken) -> Fut`, one for
//! `commit` and one for `rollback`, producing a fresh future per call.
//!
//! ## Concurrency semantics
//! - Each call creates a **new** future that owns its state.
//! - No hidden mutation between calls; shared state must be an explicit
//!   `Arc<...>` captured by the closures.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use sagaflow::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc(
//!     "charge",
//!     |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//!     |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//! );
//!
//! assert_eq!(t.name(), "charge");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::policies::Policy;
use crate::tasks::task::Task;

/// Function-backed task implementation.
pub struct TaskFn<C, R> {
    name: Cow<'static, str>,
    policy: Option<Policy>,
    commit: C,
    rollback: R,
}

impl<C, R> TaskFn<C, R> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new<CF, RF>(name: impl Into<Cow<'static, str>>, commit: C, rollback: R) -> Self
    where
        C: Fn(CancellationToken) -> CF,
        CF: Future<Output = Result<(), TaskError>>,
        R: Fn(CancellationToken) -> RF,
        RF: Future<Output = Result<(), TaskError>>,
    {
        Self {
            name: name.into(),
            policy: None,
            commit,
            rollback,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc<CF, RF>(name: impl Into<Cow<'static, str>>, commit: C, rollback: R) -> Arc<Self>
    where
        C: Fn(CancellationToken) -> CF,
        CF: Future<Output = Result<(), TaskError>>,
        R: Fn(CancellationToken) -> RF,
        RF: Future<Output = Result<(), TaskError>>,
    {
        Arc::new(Self::new(name, commit, rollback))
    }

    /// Declares the policy this task asks for (see [`Task::policy`]).
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }
}

#[async_trait]
impl<C, CF, R, RF> Task for TaskFn<C, R>
where
    C: Fn(CancellationToken) -> CF + Send + Sync + 'static,
    CF: Future<Output = Result<(), TaskError>> + Send + 'static,
    R: Fn(CancellationToken) -> RF + Send + Sync + 'static,
    RF: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn policy(&self) -> Option<Policy> {
        self.policy
    }

    async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.commit)(ctx).await
    }

    async fn rollback(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.rollback)(ctx).await
    }
}
