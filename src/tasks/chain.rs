//! # Decorator chains.
//!
//! A [`Wrap`] turns one task into another (adds panic capture, retries, ...).
//! [`Chain`] applies a list of wrappers so that the **first** wrapper ends up
//! outermost:
//!
//! ```text
//! Chain::new([a, b, c]).then(t)  ==  a(b(c(t)))
//! ```
//!
//! Built-in wrappers: [`Recover`] (→ [`SafeTask`]) and [`Retrying`] (→ [`RetryTask`]).

use std::sync::Arc;

use crate::policies::BackoffPolicy;
use crate::tasks::retry::RetryTask;
use crate::tasks::safe::SafeTask;
use crate::tasks::task::TaskRef;

/// Task decorator.
pub trait Wrap: Send + Sync + 'static {
    /// Returns `task` decorated with this wrapper's behavior.
    fn wrap(&self, task: TaskRef) -> TaskRef;
}

impl<F> Wrap for F
where
    F: Fn(TaskRef) -> TaskRef + Send + Sync + 'static,
{
    fn wrap(&self, task: TaskRef) -> TaskRef {
        self(task)
    }
}

/// Ordered list of wrappers.
#[derive(Clone, Default)]
pub struct Chain {
    wrappers: Vec<Arc<dyn Wrap>>,
}

impl Chain {
    /// Creates a chain from wrappers listed outermost first.
    pub fn new<I>(wrappers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Wrap>>,
    {
        Self {
            wrappers: wrappers.into_iter().collect(),
        }
    }

    /// Appends an innermost wrapper.
    pub fn with(mut self, wrapper: impl Wrap) -> Self {
        self.wrappers.push(Arc::new(wrapper));
        self
    }

    /// Decorates `task` with every wrapper in the chain.
    pub fn then(&self, task: TaskRef) -> TaskRef {
        self.wrappers
            .iter()
            .rev()
            .fold(task, |task, wrapper| wrapper.wrap(task))
    }
}

impl Wrap for Chain {
    fn wrap(&self, task: TaskRef) -> TaskRef {
        self.then(task)
    }
}

/// Wrapper converting panics into errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recover;

impl Wrap for Recover {
    fn wrap(&self, task: TaskRef) -> TaskRef {
        SafeTask::arc(task)
    }
}

/// Wrapper retrying `commit` with the given backoff.
#[derive(Clone, Copy, Debug, Default)]
pub struct Retrying(pub BackoffPolicy);

impl Wrap for Retrying {
    fn wrap(&self, task: TaskRef) -> TaskRef {
        RetryTask::arc(task, self.0)
    }
}
