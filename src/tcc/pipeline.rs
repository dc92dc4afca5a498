//! # Sequential TCC pipeline.
//!
//! ```text
//! try_commit: P0 ─► P1 ─► ... ─► Pk ✗     (cursor = k, Pk+1.. never tried)
//! confirm:    P0 ─► P1 ─► ... ─► Pn       (errors aggregated, never stops)
//! cancel:     Pk ─► ... ─► P0             (reverse, only tried participants)
//! ```
//!
//! Every phase, and `run` as a whole, holds the pipeline's gate.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{Info, State},
    error::TaskError,
    events::CallbackRef,
    tcc::{Tcc, TccOptions, TccRef, after_cancel, finish_phase},
};

/// Participants whose tries run in order.
pub struct TccPipeline<P> {
    info: Info,
    participants: Vec<TccRef<P>>,
    cursor: Mutex<Option<usize>>,
    callbacks: Vec<CallbackRef<P>>,
    gate: AsyncMutex<()>,
}

impl<P> TccPipeline<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates a pipeline over `participants`.
    pub fn new(participants: Vec<TccRef<P>>, options: TccOptions<P>) -> Self {
        Self {
            info: Info::new("tcc-pipeline")
                .named(options.name)
                .described("tcc pipeline"),
            participants,
            cursor: Mutex::new(None),
            callbacks: options.callbacks,
            gate: AsyncMutex::new(()),
        }
    }

    /// Participants in order.
    pub fn participants(&self) -> &[TccRef<P>] {
        &self.participants
    }

    /// Highest index whose try ran.
    pub fn cursor(&self) -> Option<usize> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<usize>> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn try_all(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        self.info.set_state(State::Running);
        *self.lock() = None;

        let mut res = Ok(());
        for (idx, participant) in self.participants.iter().enumerate() {
            if ctx.is_cancelled() {
                res = Err(TaskError::Canceled);
                break;
            }
            *self.lock() = Some(idx);
            if let Err(err) = participant.try_commit(ctx, input, &[]).await {
                res = Err(err);
                break;
            }
        }
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, false).await
    }

    async fn confirm_all(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let mut errors = None;
        for participant in &self.participants {
            errors = TaskError::combine(errors, participant.confirm(ctx, input, &[]).await.err());
        }
        let res = errors.map_or(Ok(()), Err);
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, true).await
    }

    async fn cancel_tried(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let mut errors = None;
        if let Some(cursor) = self.cursor() {
            for participant in self.participants[..=cursor].iter().rev() {
                errors = TaskError::combine(errors, participant.cancel(ctx, input, &[]).await.err());
            }
        }
        let res = errors.map_or(Ok(()), Err);
        finish_phase(&self.info, &self.callbacks, callbacks, ctx, input, res, true).await
    }
}

#[async_trait]
impl<P> Tcc<P> for TccPipeline<P>
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
        self.confirm_all(ctx, input, callbacks).await
    }

    async fn cancel(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let _gate = self.gate.lock().await;
        self.cancel_tried(ctx, input, callbacks).await
    }

    async fn run(
        &self,
        ctx: &CancellationToken,
        input: &P,
        callbacks: &[CallbackRef<P>],
    ) -> Result<(), TaskError> {
        let _gate = self.gate.lock().await;
        match self.try_all(ctx, input, callbacks).await {
            Ok(()) => self.confirm_all(ctx, input, callbacks).await,
            Err(err) => Err(after_cancel(err, self.cancel_tried(ctx, input, callbacks).await)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcc::testing::Ledger;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_try_stops_at_failure_and_cancels_in_reverse() {
        let ledger = Ledger::default();
        let pipeline = TccPipeline::<u32>::new(
            vec![
                ledger.participant("p1", false),
                ledger.participant("p2", false),
                ledger.participant("p3", true),
                ledger.participant("p4", false),
            ],
            TccOptions::default(),
        );

        let err = pipeline
            .run(&CancellationToken::new(), &3, &[])
            .await
            .expect_err("p3 fails");
        assert_eq!(err, TaskError::fail("try p3 failed"));
        assert_eq!(pipeline.cursor(), Some(2));
        assert_eq!(ledger.phase("try"), vec!["p1", "p2", "p3"]);
        assert_eq!(ledger.phase("cancel"), vec!["p3", "p2", "p1"]);
        assert!(ledger.phase("confirm").is_empty());
    }

    #[tokio::test]
    async fn test_confirm_runs_in_order() {
        let ledger = Ledger::default();
        let pipeline = TccPipeline::<u32>::new(
            vec![ledger.participant("a", false), ledger.participant("b", false)],
            TccOptions::default(),
        );

        assert!(pipeline.run(&CancellationToken::new(), &0, &[]).await.is_ok());
        assert_eq!(ledger.phase("confirm"), vec!["a", "b"]);
        assert_eq!(pipeline.info().state(), State::Success);
    }

    #[tokio::test]
    async fn test_cancel_without_try_is_noop() {
        let ledger = Ledger::default();
        let pipeline = TccPipeline::<u32>::new(
            vec![ledger.participant("a", false)],
            TccOptions::default(),
        );

        assert!(pipeline.cancel(&CancellationToken::new(), &0, &[]).await.is_ok());
        assert!(ledger.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_runs_keep_their_own_cursor() {
        let ledger = Ledger::default();
        let pipeline = Arc::new(TccPipeline::<u8>::new(
            vec![
                ledger.slow_participant("p1", false, Duration::from_secs(1)),
                ledger.participant("p2", true),
                ledger.participant("p3", false),
            ],
            TccOptions::default(),
        ));
        let ctx = CancellationToken::new();

        let (a, b) = tokio::join!(pipeline.run(&ctx, &1, &[]), pipeline.run(&ctx, &2, &[]));
        assert_eq!(a, Err(TaskError::fail("try p2 failed")));
        assert_eq!(b, Err(TaskError::fail("try p2 failed")));

        let one_run = ["try:p1", "try:p2", "cancel:p2", "cancel:p1"];
        let expected: Vec<String> = one_run.iter().chain(&one_run).map(|e| e.to_string()).collect();
        assert_eq!(ledger.entries(), expected);
        assert_eq!(pipeline.cursor(), Some(1));
    }
}
