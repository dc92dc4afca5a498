//! # Task abstractions and decorators.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for units with commit and compensating rollback
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskFn`] - closure-backed task implementation
//! - [`SafeTask`] - decorator converting panics into errors
//! - [`RetryTask`] - decorator retrying `commit` with bounded backoff
//! - [`Chain`] / [`Wrap`] - decorator pipelines ([`Recover`], [`Retrying`])

mod chain;
mod retry;
mod safe;
mod task;
mod task_fn;

pub use chain::{Chain, Recover, Retrying, Wrap};
pub use retry::RetryTask;
pub use safe::SafeTask;
pub(crate) use safe::panicked;
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
