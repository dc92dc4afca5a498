//! # Node metadata and state holder.
//!
//! [`Info`] carries the identity (id, name, description, timestamps) and the
//! lifecycle state of a flow, TCC node or executor. All mutable fields change
//! together on a transition, so they live behind **one** lock; every setter
//! refreshes the update timestamp.
//!
//! ## State machine
//! ```text
//! Ready ──► Running ──► Success
//!                  └──► Error
//! ```
//!
//! ## Error accumulation
//! [`Info::add_error`] never replaces an earlier error: a second failure is
//! appended to the first (see [`TaskError::combine`]). Once an error is
//! recorded, a state-setting call keeps the node in `Error`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::error::TaskError;

/// Global counter used to build process-unique ids.
static INFO_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Constructed, not started.
    Ready,
    /// A call is in progress.
    Running,
    /// The last step finished without error.
    Success,
    /// An error has been recorded.
    Error,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Ready => "ready",
            State::Running => "running",
            State::Success => "success",
            State::Error => "error",
        })
    }
}

#[derive(Debug)]
struct InfoState {
    name: String,
    description: String,
    state: State,
    updated_at: SystemTime,
    error: Option<TaskError>,
}

/// Thread-safe metadata and state of a node.
pub struct Info {
    id: String,
    created_at: SystemTime,
    clock: fn() -> SystemTime,
    inner: Mutex<InfoState>,
}

/// Owned copy of an [`Info`] taken under its lock.
#[derive(Clone, Debug, PartialEq)]
pub struct InfoSnapshot {
    /// Process-unique id (`<kind>-<n>`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Current state.
    pub state: State,
    /// Construction time.
    pub created_at: SystemTime,
    /// Time of the last mutation.
    pub updated_at: SystemTime,
    /// Accumulated error, if any.
    pub error: Option<TaskError>,
}

impl Info {
    /// Creates a `Ready` info with a generated id; the name defaults to the id.
    pub fn new(kind: &str) -> Self {
        Self::with_clock(kind, SystemTime::now)
    }

    /// Same as [`Info::new`] with an injected clock.
    pub fn with_clock(kind: &str, clock: fn() -> SystemTime) -> Self {
        let id = format!("{kind}-{}", INFO_SEQ.fetch_add(1, AtomicOrdering::Relaxed));
        let now = clock();
        Self {
            inner: Mutex::new(InfoState {
                name: id.clone(),
                description: String::new(),
                state: State::Ready,
                updated_at: now,
                error: None,
            }),
            id,
            created_at: now,
            clock,
        }
    }

    /// Overrides the name if `name` is `Some`.
    pub fn named(self, name: Option<String>) -> Self {
        if let Some(name) = name {
            self.set_name(name);
        }
        self
    }

    /// Sets the description.
    pub fn described(self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    fn lock(&self) -> MutexGuard<'_, InfoState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the name.
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Returns the description.
    pub fn description(&self) -> String {
        self.lock().description.clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.lock().state
    }

    /// Returns the accumulated error.
    pub fn error(&self) -> Option<TaskError> {
        self.lock().error.clone()
    }

    /// Returns the construction time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns the time of the last mutation.
    pub fn updated_at(&self) -> SystemTime {
        self.lock().updated_at
    }

    /// Sets the name.
    pub fn set_name(&self, name: impl Into<String>) {
        let mut s = self.lock();
        s.name = name.into();
        s.updated_at = (self.clock)();
    }

    /// Sets the description.
    pub fn set_description(&self, description: impl Into<String>) {
        let mut s = self.lock();
        s.description = description.into();
        s.updated_at = (self.clock)();
    }

    /// Sets the state.
    pub fn set_state(&self, state: State) {
        let mut s = self.lock();
        s.state = state;
        s.updated_at = (self.clock)();
    }

    /// Records the outcome of a step.
    ///
    /// - An existing error is kept and `err` is appended to it; with `set_state`
    ///   the state becomes `Error`.
    /// - Otherwise, with `set_state`, the state becomes `Error` or `Success`.
    /// - Without `set_state` only the error is recorded.
    pub fn add_error(&self, err: Option<TaskError>, set_state: bool) {
        let mut s = self.lock();
        let had_error = s.error.is_some();
        let has_new = err.is_some();

        s.error = TaskError::combine(s.error.take(), err);
        if set_state {
            s.state = if had_error || has_new {
                State::Error
            } else {
                State::Success
            };
        }
        if set_state || has_new {
            s.updated_at = (self.clock)();
        }
    }

    /// Takes an owned snapshot.
    pub fn snapshot(&self) -> InfoSnapshot {
        let s = self.lock();
        InfoSnapshot {
            id: self.id.clone(),
            name: s.name.clone(),
            description: s.description.clone(),
            state: s.state,
            created_at: self.created_at,
            updated_at: s.updated_at,
            error: s.error.clone(),
        }
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = Info::new("flow");
        let b = Info::new("flow");
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("flow-"));
        assert_eq!(a.name(), a.id());
        assert_eq!(a.state(), State::Ready);
    }

    #[test]
    fn test_add_error_without_state_keeps_state() {
        let info = Info::new("tcc");
        info.set_state(State::Running);
        info.add_error(Some(TaskError::fail("try")), false);
        assert_eq!(info.state(), State::Running);
        assert_eq!(info.error(), Some(TaskError::fail("try")));
    }

    #[test]
    fn test_add_error_accumulates_and_sticks_to_error() {
        let info = Info::new("tcc");
        info.add_error(Some(TaskError::fail("try")), false);
        info.add_error(None, true);
        assert_eq!(info.state(), State::Error);

        info.add_error(Some(TaskError::fail("cancel")), true);
        let err = info.error().expect("accumulated");
        assert_eq!(err.causes().len(), 2);
    }

    #[test]
    fn test_add_error_success_path() {
        let info = Info::new("tcc");
        info.add_error(None, true);
        assert_eq!(info.state(), State::Success);
        assert!(info.error().is_none());
    }

    #[test]
    fn test_setters_refresh_update_time() {
        fn epoch() -> SystemTime {
            UNIX_EPOCH + Duration::from_secs(42)
        }
        let info = Info::with_clock("x", epoch).described("demo");
        info.set_state(State::Running);
        let snap = info.snapshot();
        assert_eq!(snap.created_at, epoch());
        assert_eq!(snap.updated_at, epoch());
        assert_eq!(snap.description, "demo");
        assert_eq!(snap.state, State::Running);
    }
}
