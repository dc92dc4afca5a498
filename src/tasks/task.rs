//! # Task abstraction.
//!
//! This module defines the [`Task`] trait: a named unit with a forward action
//! ([`commit`](Task::commit)) and a compensating action ([`rollback`](Task::rollback)).
//! The common handle type is [`TaskRef`], an `Arc<dyn Task>` suitable for sharing
//! across flows, TCC nodes and the time wheel.
//!
//! A task receives a [`CancellationToken`] and should check it at its own
//! suspension points to stop cooperatively.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::policies::Policy;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Unit of work with compensation.
///
/// The engine treats tasks as stateless: any state a task needs between
/// `commit` and `rollback` is owned by the implementation.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use sagaflow::{Task, TaskError};
///
/// struct Reserve;
///
/// #[async_trait]
/// impl Task for Reserve {
///     fn name(&self) -> &str { "reserve" }
///
///     async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // reserve stock...
///         Ok(())
///     }
///
///     async fn rollback(&self, _ctx: CancellationToken) -> Result<(), TaskError> {
///         // release stock (must tolerate a commit that never completed)
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Policy the task asks for inside a flow.
    ///
    /// Only [`Policy::RevertAll`] has an effect (escalation); the default is `None`.
    fn policy(&self) -> Option<Policy> {
        None
    }

    /// Performs the forward work.
    async fn commit(&self, ctx: CancellationToken) -> Result<(), TaskError>;

    /// Performs the best-effort compensating action.
    ///
    /// Must be idempotent and tolerate being called when `commit` did not
    /// complete cleanly.
    async fn rollback(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
