//! # State-transition callbacks.
//!
//! Flow and TCC nodes report every transition of their [`Info`](crate::Info)
//! (Ready → Running → Success/Error) to two sets of [`Callback`]s:
//! - **instance callbacks** registered at construction;
//! - **call-scoped callbacks** passed to a single call.
//!
//! Instance callbacks always run first. Callbacks are awaited in order on the
//! caller's task; a slow callback delays the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::InfoSnapshot;
use crate::error::TaskError;

/// Shared handle to a callback observing payload `P`.
pub type CallbackRef<P = ()> = Arc<dyn Callback<P>>;

/// Observer of state transitions.
///
/// `input` is the payload the node operates on (`()` for flows).
#[async_trait]
pub trait Callback<P: Send + Sync + ?Sized = ()>: Send + Sync + 'static {
    /// Called with the node's current state, its payload and the error of the
    /// step that just finished (if any).
    async fn trigger(
        &self,
        ctx: &CancellationToken,
        info: &InfoSnapshot,
        input: &P,
        err: Option<&TaskError>,
    );
}

/// Triggers `instance` then `scoped` callbacks in order.
pub(crate) async fn trigger_all<P: Send + Sync + ?Sized + 'static>(
    instance: &[CallbackRef<P>],
    scoped: &[CallbackRef<P>],
    ctx: &CancellationToken,
    info: &InfoSnapshot,
    input: &P,
    err: Option<&TaskError>,
) {
    for cb in instance.iter().chain(scoped) {
        cb.trigger(ctx, info, input, err).await;
    }
}
