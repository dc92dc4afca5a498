//! # Broadcast notifier.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that implements
//! [`Notifier`]: every event and progress report becomes a [`Signal`] that any
//! number of receivers can observe.
//!
//! ## Architecture
//! ```text
//! Executors (many):                       Receivers (many):
//!   flow member 1 ──┐                  ┌──► metrics
//!   flow member 2 ──┼──► Bus ──────────┼──► audit log
//!   TCC step      ──┘  (broadcast)     └──► tests
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent signals for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: signals are lost if there are no active receivers at send time.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::events::{Event, Notifier};

/// One item on the bus.
#[derive(Clone, Debug)]
pub enum Signal {
    /// An execution event.
    Event(Event),
    /// A progress report.
    Progress {
        /// Task name.
        task: Arc<str>,
        /// Progress percentage.
        progress: f32,
    },
}

impl Signal {
    /// Returns the event, if this signal carries one.
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Signal::Event(ev) => Some(ev),
            Signal::Progress { .. } => None,
        }
    }
}

/// Broadcast channel for execution signals.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately (send clones internally).
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Signal>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Signal>(capacity.max(1));
        Self { tx }
    }

    /// Publishes a signal to all active receivers.
    ///
    /// If there are no receivers, the signal is dropped.
    pub fn publish(&self, signal: Signal) {
        let _ = self.tx.send(signal);
    }

    /// Creates a new receiver that will observe subsequent signals.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(1024)
    }
}

impl Notifier for Bus {
    fn event(&self, _ctx: &CancellationToken, event: &Event) {
        self.publish(Signal::Event(event.clone()));
    }

    fn notify(&self, _ctx: &CancellationToken, name: &str, progress: f32) {
        self.publish(Signal::Progress {
            task: name.into(),
            progress,
        });
    }
}
