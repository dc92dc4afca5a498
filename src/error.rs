//! Error types used by the sagaflow runtime and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`TaskError`] — errors raised by task execution, compensation and the
//!   compositions built on top of them (flows, TCC).
//! - [`RuntimeError`] — errors raised by runtime services themselves (the time wheel).
//!
//! Aggregation follows a flat model: [`TaskError::combine`] never nests
//! [`TaskError::Multiple`] inside another one, so [`TaskError::causes`] always
//! yields the leaf failures in the order they were recorded.

use thiserror::Error;

/// # Errors produced by the sagaflow runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The time wheel control loop has exited; the request was not delivered.
    #[error("time wheel is stopped")]
    WheelStopped,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sagaflow::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::WheelStopped.as_label(), "runtime_wheel_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::WheelStopped => "runtime_wheel_stopped",
        }
    }
}

/// # Errors produced by task execution.
///
/// Commit and rollback failures are reported as [`TaskError::Fail`]; captured
/// panics as [`TaskError::Panicked`]; several independent failures as a single
/// flat [`TaskError::Multiple`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The execution context was cancelled.
    #[error("context cancelled")]
    Canceled,

    /// The task terminated abnormally; the panic was captured.
    #[error("task panicked: {cause}")]
    Panicked {
        /// Panic payload rendered as text.
        cause: String,
        /// Stack trace captured where the panic was contained.
        trace: String,
    },

    /// Several independent operations failed.
    #[error("{}", join_messages(.errors))]
    Multiple {
        /// Leaf errors in the order they were recorded (never nested).
        errors: Vec<TaskError>,
    },
}

fn join_messages(errors: &[TaskError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sagaflow::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Multiple { .. } => "task_multiple",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
            TaskError::Panicked { cause, .. } => format!("panic: {cause}"),
            TaskError::Multiple { errors } => {
                format!("{} errors: {}", errors.len(), join_messages(errors))
            }
        }
    }

    /// Indicates whether the error is worth another commit attempt.
    ///
    /// Every failure is retryable unless it is, or contains, a cancellation.
    pub fn is_retryable(&self) -> bool {
        !self.is_canceled()
    }

    /// Returns `true` if this error is, or contains, a cancellation.
    pub fn is_canceled(&self) -> bool {
        self.causes()
            .iter()
            .any(|e| matches!(e, TaskError::Canceled))
    }

    /// Returns the leaf errors (a single-element list for non-aggregates).
    pub fn causes(&self) -> Vec<&TaskError> {
        match self {
            TaskError::Multiple { errors } => errors.iter().collect(),
            other => vec![other],
        }
    }

    /// Merges two errors into one flat aggregate.
    ///
    /// # Example
    /// ```
    /// use sagaflow::TaskError;
    ///
    /// let err = TaskError::fail("a")
    ///     .merge(TaskError::fail("b"))
    ///     .merge(TaskError::fail("c"));
    /// assert_eq!(err.causes().len(), 3);
    /// ```
    pub fn merge(self, other: TaskError) -> TaskError {
        let mut errors = self.into_leaves();
        errors.extend(other.into_leaves());
        TaskError::Multiple { errors }
    }

    /// Appends `rhs` to `lhs`, keeping whichever side is present.
    ///
    /// Neither side is ever dropped: two errors become one aggregate.
    pub fn combine(lhs: Option<TaskError>, rhs: Option<TaskError>) -> Option<TaskError> {
        match (lhs, rhs) {
            (None, None) => None,
            (Some(e), None) | (None, Some(e)) => Some(e),
            (Some(a), Some(b)) => Some(a.merge(b)),
        }
    }

    fn into_leaves(self) -> Vec<TaskError> {
        match self {
            TaskError::Multiple { errors } => errors,
            other => vec![other],
        }
    }
}
