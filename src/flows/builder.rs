//! # Flow builder.
//!
//! Collects members on top of a [`Config`] and produces either flow kind.
//!
//! # Example
//! ```
//! use tokio_util::sync::CancellationToken;
//! use sagaflow::{Config, FlowBuilder, Policy, TaskError, TaskFn};
//!
//! let reserve = TaskFn::arc(
//!     "reserve",
//!     |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//!     |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//! );
//!
//! let flow = FlowBuilder::new(Config::new(Policy::Revert).with_name("checkout"))
//!     .task(reserve)
//!     .sequential();
//!
//! assert_eq!(flow.tasks().len(), 1);
//! ```

use crate::{
    config::Config,
    flows::{ConcurrentFlow, SequentialFlow},
    tasks::TaskRef,
};

/// Builder for [`SequentialFlow`] and [`ConcurrentFlow`].
pub struct FlowBuilder {
    config: Config,
}

impl FlowBuilder {
    /// Starts from `config` (its `tasks` become the first members).
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Appends one member.
    pub fn task(mut self, task: TaskRef) -> Self {
        self.config.tasks.push(task);
        self
    }

    /// Appends several members.
    pub fn tasks(mut self, tasks: impl IntoIterator<Item = TaskRef>) -> Self {
        self.config.tasks.extend(tasks);
        self
    }

    /// Builds a flow committing members in order.
    pub fn sequential(self) -> SequentialFlow {
        SequentialFlow::new(self.config)
    }

    /// Builds a flow committing members in parallel.
    pub fn concurrent(self) -> ConcurrentFlow {
        ConcurrentFlow::new(self.config)
    }
}
