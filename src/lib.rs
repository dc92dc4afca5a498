//! # sagaflow
//!
//! **Sagaflow** is a saga / task-orchestration library for Rust.
//!
//! It executes units of work ("tasks") with compensating rollback on failure,
//! composes them into sequential and concurrent flows, coordinates
//! Try-Confirm-Cancel transactions, and defers delivery of tasks through a
//! time wheel. Everything runs in-process on tokio; task bodies are ordinary
//! async code whose effects are the caller's responsibility.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Task     │   │     Task     │   │     Task     │
//!     │ commit/undo  │   │ commit/undo  │   │ commit/undo  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SequentialFlow / ConcurrentFlow (built from Config)              │
//! │  - ledger of attempted members (cursor / executed set)            │
//! │  - compensation pass (reverse order / concurrent)                 │
//! │  - Callback fan-out on every state transition                     │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Executor   │   │   Executor   │   │   Executor   │
//!     │ retry/revert │   │ retry/revert │   │ retry/revert │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ Events: TaskStarting, CommitFailed, RetryScheduled,
//!            │         TaskCompleted, RollbackCompleted/Failed
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Notifier (NoopNotifier │ Bus (broadcast) │ LogWriter (tracing))  │
//! └───────────────────────────────────────────────────────────────────┘
//!
//!     SingleTcc ◄── TccGroup (parallel tries) ◄── TccPipeline (ordered tries)
//!
//!     WheelHandle ──► mpsc ──► TimeWheel control loop ──► TimerCallback
//! ```
//!
//! ### Executor lifecycle
//! ```text
//! commit ─┬─ Ok  ─► Success
//!         └─ Err ─► Policy::Retry? ─► sleep(backoff) │ ctx cancelled ─► commit ...
//!                   └─ exhausted / not retrying ─► rollback once ─► Error(commit ⊕ rollback)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                           |
//! |-------------------|--------------------------------------------------------------|----------------------------------------------|
//! | **Tasks**         | Units with commit and compensating rollback, decorators.     | [`Task`], [`TaskFn`], [`SafeTask`], [`Chain`] |
//! | **Policies**      | Failure handling and bounded exponential backoff.            | [`Policy`], [`BackoffPolicy`], [`Backoff`]   |
//! | **Execution**     | One task under one policy, with state tracking.              | [`Executor`], [`Info`], [`State`]            |
//! | **Flows**         | Sequential and concurrent composition with compensation.     | [`SequentialFlow`], [`ConcurrentFlow`]       |
//! | **TCC**           | Try-Confirm-Cancel over one payload.                         | [`Tcc`], [`SingleTcc`], [`TccGroup`]         |
//! | **Time wheel**    | Deferred delivery of tasks.                                  | [`TimeWheel`], [`DelayTask`], [`Wheel`]      |
//! | **Observability** | Events, progress and state callbacks.                        | [`Notifier`], [`Bus`], [`Callback`]          |
//! | **Errors**        | Typed, flat-aggregating errors.                              | [`TaskError`], [`RuntimeError`]              |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a notifier forwarding events to `tracing`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use sagaflow::{Config, FlowBuilder, Policy, TaskError, TaskFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let reserve = TaskFn::arc(
//!         "reserve",
//!         |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//!         |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//!     );
//!     let charge = TaskFn::arc(
//!         "charge",
//!         |_ctx: CancellationToken| async { Err::<(), _>(TaskError::fail("card declined")) },
//!         |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
//!     );
//!
//!     let flow = FlowBuilder::new(Config::new(Policy::Revert).with_name("checkout"))
//!         .task(reserve)
//!         .task(charge)
//!         .sequential();
//!
//!     let ctx = CancellationToken::new();
//!     if let Err(err) = flow.run(&ctx).await {
//!         assert_eq!(err, TaskError::fail("card declined"));
//!         // undo "reserve"; "charge" was already rolled back by its executor
//!         flow.compensate(&ctx).await.unwrap();
//!     }
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod flows;
mod policies;
mod tasks;
mod tcc;
mod wheel;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Executor, Info, InfoSnapshot, State};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Callback, CallbackRef, Event, EventKind, NoopNotifier, Notifier, NotifierRef, Signal};
pub use flows::{ConcurrentFlow, FlowBuilder, SequentialFlow};
pub use policies::{Backoff, BackoffPolicy, Policy};
pub use tasks::{Chain, Recover, RetryTask, Retrying, SafeTask, Task, TaskFn, TaskRef, Wrap};
pub use tcc::{SingleTcc, Tcc, TccGroup, TccOptions, TccPipeline, TccRef};
pub use wheel::{
    DelayTask, TimeWheel, TimeWheelBuilder, TimerCallback, TimerCallbackRef, Wheel, WheelConfig,
    WheelHandle,
};

// Optional: expose a notifier forwarding events to `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use events::LogWriter;
