//! # Try-Confirm-Cancel coordination.
//!
//! A [`Tcc`] node runs a two-phase compensating transaction over one payload:
//! a tentative `try_commit`, then either `confirm` (every try succeeded) or
//! `cancel` (some try failed).
//!
//! - [`SingleTcc`] wraps one (try, confirm, cancel) task triple.
//! - [`TccGroup`] runs participants' tries concurrently; the first failure
//!   cancels the participants that have not started yet.
//! - [`TccPipeline`] runs participants' tries in order and cancels in reverse.
//!
//! Group and pipeline are themselves [`Tcc`]s, so they nest.
//!
//! ```text
//! run(input):
//!   try_commit ──► Ok  ─► confirm ─► result
//!              └─► Err ─► cancel  ─► try_err ⊕ cancel_err
//! ```
//!
//! Group and pipeline hold a run gate for the whole of `run` and for each
//! phase called on its own, so the bookkeeping that decides who gets cancelled
//! always belongs to a single run.
//!
//! Every phase reports the node's [`InfoSnapshot`](crate::InfoSnapshot), the
//! payload and the phase error to instance callbacks, then to the callbacks
//! passed to the call.

mod group;
mod pipeline;
mod single;

pub use group::TccGroup;
pub use pipeline::TccPipeline;
pub use single::SingleTcc;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    core::Info,
    error::TaskError,
    events::{CallbackRef, trigger_all},
};

/// Shared handle to a TCC node over payload `P`.
pub type TccRef<P> = Arc<dyn Tcc<P>>;

/// Two-phase compensating transaction.
#[async_trait]
pub trait Tcc<P>: Send + Sync + 'static
where
    P: Clone + Send + Sync + 'static,
{
    /// Node metadata and state.
    fn info(&self) -> &Info;

    /// Tentatively reserves whatever the transaction needs.
    async fn try_commit(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError>;

    /// Finalizes a successful try.
    async fn confirm(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError>;

    /// Releases what a try reserved.
    async fn cancel(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError>;

    /// Runs `try_commit`, then `confirm` or `cancel`.
    ///
    /// A failed try is always returned, combined with the cancel error if any.
    async fn run(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        match self.try_commit(ctx, input, callbacks).await {
            Ok(()) => self.confirm(ctx, input, callbacks).await,
            Err(err) => Err(after_cancel(err, self.cancel(ctx, input, callbacks).await)),
        }
    }
}

/// Folds a failed try with the outcome of the cancel that followed it.
fn after_cancel(err: TaskError, cancel: Result<(), TaskError>) -> TaskError {
    match cancel {
        Ok(()) => err,
        Err(cancel) => err.merge(cancel),
    }
}

/// Construction parameters shared by every TCC node.
pub struct TccOptions<P> {
    /// Display name; generated when `None`.
    pub name: Option<String>,
    /// Phase observers.
    pub callbacks: Vec<CallbackRef<P>>,
}

impl<P> Default for TccOptions<P> {
    fn default() -> Self {
        Self {
            name: None,
            callbacks: Vec::new(),
        }
    }
}

impl<P> TccOptions<P> {
    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a phase observer.
    pub fn with_callback(mut self, callback: CallbackRef<P>) -> Self {
        self.callbacks.push(callback);
        self
    }
}

impl<P> fmt::Debug for TccOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TccOptions")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Records a phase outcome on `info` and reports it.
async fn finish_phase<P>(
    info: &Info,
    instance: &[CallbackRef<P>],
    scoped: &[CallbackRef<P>],
    ctx: &CancellationToken,
    input: &P,
    res: Result<(), TaskError>,
    set_state: bool,
) -> Result<(), TaskError>
where
    P: Send + Sync + 'static,
{
    info.add_error(res.clone().err(), set_state);
    let snapshot = info.snapshot();
    trigger_all(instance, scoped, ctx, &snapshot, input, res.as_ref().err()).await;
    res
}
