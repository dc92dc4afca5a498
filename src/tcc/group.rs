//! # Parallel TCC group.
//!
//! ```text
//! try_commit:
//!   child = ctx.child_token()
//!   ├─► participant 0: child cancelled? abandon : tried[0] = true, try_commit
//!   ├─► ...
//!   └─► participant n
//!   first failure cancels `child` (at most once); every started try's error is kept
//!
//! confirm / cancel:
//!   dispatched concurrently to tried participants only, errors aggregated
//! ```
//!
//! Every phase, and `run` as a whole, holds the group's gate.
//!
//! Abandoned participants never ran, so they contribute no error and are never
//! confirmed or cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::{sync::Mutex as AsyncMutex, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{FirstError, Info, State},
    error::TaskError,
    events::CallbackRef,
    tasks::panicked,
    tcc::{Tcc, TccOptions, TccRef, after_cancel, finish_phase},
};

#[derive(Clone, Copy)]
enum Phase {
    Confirm,
    Cancel,
}

/// Participants whose tries run concurrently.
pub struct TccGroup<P> {
    info: Info,
    participants: Vec<TccRef<P>>,
    tried: Arc<Mutex<Vec<bool>>>,
    callbacks: Vec<CallbackRef<P>>,
    gate: AsyncMutex<()>,
}

impl<P> TccGroup<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates a group over `participants`.
    pub fn new(participants: Vec<TccRef<P>>, options: TccOptions<P>) -> Self {
        let tried = vec![false; participants.len()];
        Self {
            info: Info::new("tcc-group")
                .named(options.name)
                .described("tcc group"),
            participants,
            tried: Arc::new(Mutex::new(tried)),
            callbacks: options.callbacks,
            gate: AsyncMutex::new(()),
        }
    }

    /// Participants in declaration order.
    pub fn participants(&self) -> &[TccRef<P>] {
        &self.participants
    }

    /// Indices of participants whose try started.
    pub fn tried(&self) -> Vec<usize> {
        lock(&self.tried)
            .iter()
            .enumerate()
            .filter_map(|(idx, tried)| tried.then_some(idx))
            .collect()
    }

    async fn settle(&self, ctx: &CancellationToken, input: &P, phase: Phase) -> Option<TaskError> {
        let mut workers = JoinSet::new();
        for idx in self.tried() {
            let participant = self.participants[idx].clone();
            let (ctx, input) = (ctx.clone(), input.clone());
            workers.spawn(async move {
                match phase {
                    Phase::Confirm => participant.confirm(&ctx, &input, &[]).await,
                    Phase::Cancel => participant.cancel(&ctx, &input, &[]).await,
                }
            });
        }
        join_errors(&mut workers, |_| {}).await
    }

    async fn try_all(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        self.info.set_state(State::Running);
        lock(&self.tried).fill(false);

        let child = ctx.child_token();
        let first = Arc::new(FirstError::new(child.clone()));
        let mut workers = JoinSet::new();

        for (idx, participant) in self.participants.iter().enumerate() {
            let participant = participant.clone();
            let (child, first, tried) = (child.clone(), first.clone(), self.tried.clone());
            let input = input.clone();

            workers.spawn(async move {
                if child.is_cancelled() {
                    return Ok(());
                }
                lock(&tried)[idx] = true;
                let res = participant.try_commit(&child, &input, &[]).await;
                if let Err(err) = &res {
                    first.capture(err.clone());
                }
                res
            });
        }

        let errors = join_errors(&mut workers, |err| {
            first.capture(err.clone());
        })
        .await;
        child.cancel();

        let res = match errors {
            Some(err) => Err(err),
            None if ctx.is_cancelled() && self.tried().len() < self.participants.len() => {
                Err(TaskError::Canceled)
            }
            None => Ok(()),
        };
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, false).await
    }

    async fn finish(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
        phase: Phase,
    ) -> Result<(), TaskError> {
        let res = match self.settle(ctx, input, phase).await {
            Some(err) => Err(err),
            None => Ok(()),
        };
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, true).await
    }
}

fn lock(tried: &Mutex<Vec<bool>>) -> MutexGuard<'_, Vec<bool>> {
    tried.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits for every worker and aggregates their errors.
async fn join_errors(
    workers: &mut JoinSet<Result<(), TaskError>>,
    mut on_error: impl FnMut(&TaskError),
) -> Option<TaskError> {
    let mut errors = None;
    while let Some(joined) = workers.join_next().await {
        let err = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(e) if e.is_panic() => panicked(e.into_panic().as_ref()),
            Err(_) => TaskError::Canceled,
        };
        on_error(&err);
        errors = TaskError::combine(errors, Some(err));
    }
    errors
}

#[async_trait]
impl<P> Tcc<P> for TccGroup<P>
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
        let _gate = self.gate.lock().await;
        self.try_all(ctx, input, callbacks).await
    }

    async fn confirm(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let _gate = self.gate.lock().await;
        self.finish(ctx, input, callbacks, Phase::Confirm).await
    }

    async fn cancel(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let _gate = self.gate.lock().await;
        self.finish(ctx, input, callbacks, Phase::Cancel).await
    }

    async fn run(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let _gate = self.gate.lock().await;
        match self.try_all(ctx, input, callbacks).await {
            Ok(()) => self.finish(ctx, input, callbacks, Phase::Confirm).await,
            Err(err) => {
                let cancel = self.finish(ctx, input, callbacks, Phase::Cancel).await;
                Err(after_cancel(err, cancel))
            }
        }
    }
}
