//! # Progress and event sink.
//!
//! [`Notifier`] is the extension point through which the executor reports
//! what it is doing. Calls are synchronous and fire-and-forget: a notifier
//! must not block, and it cannot fail the task it observes.
//!
//! ```text
//! Executor ──► notifier.event(ctx, &Event)          (starting / failed / retry / rollback)
//!          └─► notifier.notify(ctx, name, progress) (0.0 on start and after rollback, 100.0 on success)
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::events::Event;

/// Shared handle to a notifier.
pub type NotifierRef = Arc<dyn Notifier>;

/// Event and progress sink implemented by callers.
///
/// # Example
/// ```
/// use std::sync::Mutex;
/// use tokio_util::sync::CancellationToken;
/// use sagaflow::{Event, Notifier};
///
/// #[derive(Default)]
/// struct Progress(Mutex<Vec<(String, f32)>>);
///
/// impl Notifier for Progress {
///     fn event(&self, _ctx: &CancellationToken, _event: &Event) {}
///
///     fn notify(&self, _ctx: &CancellationToken, name: &str, progress: f32) {
///         if let Ok(mut v) = self.0.lock() {
///             v.push((name.to_string(), progress));
///         }
///     }
/// }
/// ```
pub trait Notifier: Send + Sync + 'static {
    /// Records an execution event.
    fn event(&self, ctx: &CancellationToken, event: &Event);

    /// Reports progress (`0.0..=100.0`) of the named task.
    fn notify(&self, ctx: &CancellationToken, name: &str, progress: f32);
}

/// Notifier that discards everything (the default).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn event(&self, _ctx: &CancellationToken, _event: &Event) {}

    fn notify(&self, _ctx: &CancellationToken, _name: &str, _progress: f32) {}
}

impl NoopNotifier {
    /// Returns the no-op notifier as a shared handle.
    pub fn arc() -> NotifierRef {
        Arc::new(NoopNotifier)
    }
}
