//! # Single TCC transaction.
//!
//! Wraps three tasks: `try`, `confirm` and `cancel`. Each phase calls the
//! `commit` of its task exactly once; a phase task is never retried and its
//! `rollback` is never called, since `cancel` is the compensation. The payload
//! is handed to callbacks.

use std::marker::PhantomData;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{Info, State},
    error::TaskError,
    events::CallbackRef,
    tasks::TaskRef,
    tcc::{Tcc, TccOptions, finish_phase},
};

/// One (try, confirm, cancel) triple.
pub struct SingleTcc<P> {
    info: Info,
    try_task: TaskRef,
    confirm_task: TaskRef,
    cancel_task: TaskRef,
    callbacks: Vec<CallbackRef<P>>,
    _payload: PhantomData<fn(P)>,
}

impl<P> SingleTcc<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates a transaction from its three phase tasks.
    pub fn new(
        try_task: TaskRef,
        confirm_task: TaskRef,
        cancel_task: TaskRef,
        options: TccOptions<P>,
    ) -> Self {
        Self {
            info: Info::new("tcc").named(options.name).described("tcc"),
            try_task,
            confirm_task,
            cancel_task,
            callbacks: options.callbacks,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P> Tcc<P> for SingleTcc<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn info(&self) -> &Info {
        &self.info
    }

    async fn try_commit(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        self.info.set_state(State::Running);
        let res = self.try_task.commit(ctx.clone()).await;
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, false).await
    }

    async fn confirm(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let res = self.confirm_task.commit(ctx.clone()).await;
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, true).await
    }

    async fn cancel(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let res = self.cancel_task.commit(ctx.clone()).await;
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, true).await
    }
}
