//! # Flow configuration.
//!
//! [`Config`] is the single explicit value a flow is built from. Defaults are
//! applied by [`Config::new`]; `with_*` setters override them one by one.
//! Only the policy has no default: every flow states how it reacts to failure.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use sagaflow::{Config, Policy};
//!
//! let cfg = Config::new(Policy::Retry)
//!     .with_name("checkout")
//!     .with_attempts(5)
//!     .with_interval(Duration::from_millis(50));
//!
//! assert_eq!(cfg.attempts, 5);
//! assert_eq!(cfg.backoff().interval, Duration::from_millis(50));
//! ```
//!
//! ## Field semantics
//! - `name`: overrides the generated `<kind>-<n>` name
//! - `attempts`: retries after the first failed commit (`Policy::Retry` only)
//! - `interval`: base backoff delay
//! - `policy`: failure-handling mode for members
//! - `notifier`: event/progress sink shared by every member executor
//! - `callbacks`: state-change observers of the flow itself
//! - `tasks`: initial member list

use std::fmt;
use std::time::Duration;

use crate::events::{CallbackRef, NoopNotifier, NotifierRef};
use crate::policies::{BackoffPolicy, Policy};
use crate::tasks::TaskRef;

/// Construction parameters of a flow.
#[derive(Clone)]
pub struct Config {
    /// Display name; generated when `None`.
    pub name: Option<String>,
    /// Retry cap.
    pub attempts: u32,
    /// Base backoff interval.
    pub interval: Duration,
    /// Failure-handling mode.
    pub policy: Policy,
    /// Event sink.
    pub notifier: NotifierRef,
    /// State-change observers.
    pub callbacks: Vec<CallbackRef>,
    /// Initial members.
    pub tasks: Vec<TaskRef>,
}

impl Config {
    /// Creates a configuration with the given policy and defaults:
    ///
    /// - `attempts = 3`, `interval = 100ms`
    /// - no-op notifier, no callbacks, no tasks
    pub fn new(policy: Policy) -> Self {
        let backoff = BackoffPolicy::default();
        Self {
            name: None,
            attempts: backoff.attempts,
            interval: backoff.interval,
            policy,
            notifier: NoopNotifier::arc(),
            callbacks: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the retry cap.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the base backoff interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the event sink.
    pub fn with_notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = notifier;
        self
    }

    /// Adds a state-change observer.
    pub fn with_callback(mut self, callback: CallbackRef) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Appends members.
    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = TaskRef>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Returns retry cap and interval as a [`BackoffPolicy`].
    #[inline]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.attempts, self.interval)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("attempts", &self.attempts)
            .field("interval", &self.interval)
            .field("policy", &self.policy)
            .field("callbacks", &self.callbacks.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
