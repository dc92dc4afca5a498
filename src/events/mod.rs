//! Observability: events, notifiers and callbacks.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Notifier`], [`NoopNotifier`] event/progress sink used by the executor
//! - [`Bus`] broadcast notifier over `tokio::sync::broadcast`
//! - [`Callback`] state-transition observer used by flows and TCC nodes
//! - `LogWriter` (feature `logging`) notifier forwarding to `tracing`
//!
//! ## Quick reference
//! - **Publishers**: `Executor` (events, progress), time wheel (`TimerFired`),
//!   flows and TCC nodes (callbacks).
//! - **Consumers**: user notifiers and callbacks.

mod bus;
mod callback;
mod event;
#[cfg(feature = "logging")]
mod log;
mod notifier;
#[cfg(test)]
pub(crate) mod testing;

pub use bus::{Bus, Signal};
pub(crate) use callback::trigger_all;
pub use callback::{Callback, CallbackRef};
pub use event::{Event, EventKind};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use notifier::{NoopNotifier, Notifier, NotifierRef};
