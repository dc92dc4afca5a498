//! # Execution events reported through a [`Notifier`](crate::Notifier).
//!
//! The [`EventKind`] enum classifies what the executor and the time wheel report:
//! - **Forward events**: starting, completed, commit failed, retry scheduled
//! - **Compensation events**: rollback completed / failed
//! - **Timer events**: a delayed task was handed to its callbacks
//!
//! The [`Event`] struct carries metadata such as timestamps, task name,
//! attempt number, delays and failure reasons. Its `Display` implementation
//! renders the human-readable sentence a log line would carry.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use sagaflow::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::CommitFailed)
//!     .with_task("reserve-stock")
//!     .with_reason("out of stock")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::CommitFailed);
//! assert_eq!(ev.task.as_deref(), Some("reserve-stock"));
//! assert_eq!(
//!     ev.to_string(),
//!     "task called reserve-stock commits appears out of stock (attempt 2)"
//! );
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of execution events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The executor is about to call `commit` for the first time.
    ///
    /// Sets: `task`.
    TaskStarting,

    /// A commit succeeded (first try or a retry).
    ///
    /// Sets: `task`.
    TaskCompleted,

    /// A commit failed.
    ///
    /// Sets: `task`, `attempt`, `reason`.
    CommitFailed,

    /// A retry was scheduled after a failed commit.
    ///
    /// Sets: `task`, `attempt` (retry number, 1-based), `delay_ms`.
    RetryScheduled,

    /// Rollback finished without error.
    ///
    /// Sets: `task`.
    RollbackCompleted,

    /// Rollback reported an error.
    ///
    /// Sets: `task`, `reason`.
    RollbackFailed,

    /// A delayed task reached its slot and was handed to the callbacks.
    ///
    /// Sets: `task` (timer id).
    TimerFired,
}

/// Execution event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Attempt number (0 = first commit, n = n-th retry).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (error message).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns `true` for events that report a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, EventKind::CommitFailed | EventKind::RollbackFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task.as_deref().unwrap_or("unknown");
        let reason = self.reason.as_deref().unwrap_or("unknown error");
        match self.kind {
            EventKind::TaskStarting => write!(f, "task called {task} starts running"),
            EventKind::TaskCompleted => write!(f, "task called {task} ends running"),
            EventKind::CommitFailed => {
                write!(f, "task called {task} commits appears {reason}")?;
                match self.attempt {
                    Some(n) if n > 0 => write!(f, " (attempt {n})"),
                    _ => Ok(()),
                }
            }
            EventKind::RetryScheduled => write!(
                f,
                "task called {task} retries in {}ms (attempt {})",
                self.delay_ms.unwrap_or_default(),
                self.attempt.unwrap_or_default()
            ),
            EventKind::RollbackCompleted => write!(f, "task called {task} rolled back"),
            EventKind::RollbackFailed => {
                write!(f, "task called {task} rollbacks appears {reason}")
            }
            EventKind::TimerFired => write!(f, "timer {task} fired"),
        }
    }
}
