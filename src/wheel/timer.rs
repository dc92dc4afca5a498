//! # Time wheel control loop.
//!
//! [`TimeWheel`] owns a [`Wheel`] inside one spawned task. Every mutation
//! (add, remove, tick, stop) is a message processed by that loop in arrival
//! order, so the slots need no lock.
//!
//! ```text
//! WheelHandle::add_timer ──► mpsc ──┐
//! WheelHandle::remove_timer ──► ────┤
//!                                   ▼
//!                      loop select! (biased) {
//!                        token.cancelled()  ─► exit
//!                        rx.recv()          ─► Wheel::add / Wheel::remove (None ─► exit)
//!                        ticker.tick()      ─► Wheel::advance ─► spawn(callbacks)
//!                      }
//! ```
//!
//! ## Rules
//! - Submitters only wait for queue space, never for processing.
//! - Fired tasks are delivered on a spawned task; a slow callback never delays
//!   the tick loop.
//! - Stopping does not cancel deliveries already handed off.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    select,
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::RuntimeError,
    events::{Event, EventKind, NoopNotifier, NotifierRef},
    wheel::slots::{DelayTask, Wheel},
};

/// Receiver of fired timers.
#[async_trait]
pub trait TimerCallback: Send + Sync + 'static {
    /// Called once per fired timer.
    async fn trigger(&self, ctx: &CancellationToken, task: &DelayTask);
}

/// Shared handle to a timer callback.
pub type TimerCallbackRef = Arc<dyn TimerCallback>;

/// Time wheel parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WheelConfig {
    /// How far the cursor moves per slot (min 1ms).
    pub tick: Duration,
    /// Number of slots (min 1).
    pub slots: usize,
    /// Capacity of the command queue (min 1).
    pub queue_capacity: usize,
}

impl Default for WheelConfig {
    /// Returns a config with:
    /// - `tick = 1s`;
    /// - `slots = 60`;
    /// - `queue_capacity = 1024`.
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            slots: 60,
            queue_capacity: 1024,
        }
    }
}

impl WheelConfig {
    /// Returns a copy with every field clamped to its minimum.
    pub fn clamped(&self) -> Self {
        Self {
            tick: self.tick.max(Duration::from_millis(1)),
            slots: self.slots.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

enum Command {
    Add(DelayTask),
    Remove(String),
}

/// Cloneable submitter for a running [`TimeWheel`].
#[derive(Clone)]
pub struct WheelHandle {
    tx: mpsc::Sender<Command>,
    token: CancellationToken,
}

impl WheelHandle {
    /// Schedules `task`.
    pub async fn add_timer(&self, task: DelayTask) -> Result<(), RuntimeError> {
        self.send(Command::Add(task)).await
    }

    /// Cancels every pending timer with `id`; an empty id is ignored.
    pub async fn remove_timer(&self, id: &str) -> Result<(), RuntimeError> {
        if id.is_empty() {
            return Ok(());
        }
        self.send(Command::Remove(id.to_string())).await
    }

    async fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        if self.token.is_cancelled() {
            return Err(RuntimeError::WheelStopped);
        }
        self.tx.send(cmd).await.map_err(|_| RuntimeError::WheelStopped)
    }
}

/// Builder for [`TimeWheel`].
pub struct TimeWheelBuilder {
    config: WheelConfig,
    callbacks: Vec<TimerCallbackRef>,
    notifier: NotifierRef,
}

impl TimeWheelBuilder {
    /// Adds a receiver of fired timers.
    pub fn callback(mut self, callback: TimerCallbackRef) -> Self {
        self.callbacks.push(callback);
        self
    }

    /// Sets the sink for `TimerFired` events.
    pub fn notifier(mut self, notifier: NotifierRef) -> Self {
        self.notifier = notifier;
        self
    }

    /// Spawns the control loop.
    ///
    /// The loop stops when `ctx` is cancelled, on [`TimeWheel::stop`], or once
    /// every handle is dropped. Callbacks receive `ctx`.
    pub fn start(self, ctx: &CancellationToken) -> TimeWheel {
        let config = self.config.clamped();
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let token = ctx.child_token();

        let control = ControlLoop {
            wheel: Wheel::new(config.tick, config.slots),
            callbacks: Arc::new(self.callbacks),
            notifier: self.notifier,
            ctx: ctx.clone(),
        };
        let join = tokio::spawn(control.run(rx, token.clone()));

        TimeWheel {
            handle: WheelHandle { tx, token },
            join: Mutex::new(Some(join)),
        }
    }
}

/// Running time wheel.
pub struct TimeWheel {
    handle: WheelHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl TimeWheel {
    /// Starts building a wheel.
    pub fn builder(config: WheelConfig) -> TimeWheelBuilder {
        TimeWheelBuilder {
            config,
            callbacks: Vec::new(),
            notifier: NoopNotifier::arc(),
        }
    }

    /// Returns a cloneable submitter.
    pub fn handle(&self) -> WheelHandle {
        self.handle.clone()
    }

    /// Schedules `task`.
    pub async fn add_timer(&self, task: DelayTask) -> Result<(), RuntimeError> {
        self.handle.add_timer(task).await
    }

    /// Cancels every pending timer with `id`; an empty id is ignored.
    pub async fn remove_timer(&self, id: &str) -> Result<(), RuntimeError> {
        self.handle.remove_timer(id).await
    }

    /// Signals the loop to exit; returns immediately.
    pub fn stop(&self) {
        self.handle.token.cancel();
    }

    /// Returns `true` once [`stop`](Self::stop) was called or the parent context was cancelled.
    pub fn is_stopped(&self) -> bool {
        self.handle.token.is_cancelled()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(join) = join else {
            return;
        };
        if let Err(err) = join.await {
            tracing::warn!(error = %err, "time wheel loop terminated abnormally");
        }
    }
}

struct ControlLoop {
    wheel: Wheel,
    callbacks: Arc<Vec<TimerCallbackRef>>,
    notifier: NotifierRef,
    ctx: CancellationToken,
}

impl ControlLoop {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, token: CancellationToken) {
        let tick = self.wheel.tick();
        let mut ticker = time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            select! {
                biased;

                _ = token.cancelled() => break,

                cmd = rx.recv() => match cmd {
                    Some(Command::Add(task)) => {
                        let slot = self.wheel.add(task);
                        tracing::debug!(slot, "timer added");
                    }
                    Some(Command::Remove(id)) => {
                        if !self.wheel.remove(&id) {
                            tracing::debug!(id = %id, "timer not pending");
                        }
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    for task in self.wheel.advance() {
                        self.dispatch(task);
                    }
                }
            }
        }
        tracing::debug!(pending = self.wheel.len(), "time wheel stopped");
    }

    fn dispatch(&self, task: DelayTask) {
        self.notifier.event(
            &self.ctx,
            &Event::new(EventKind::TimerFired).with_task(task.id()),
        );
        let callbacks = self.callbacks.clone();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            for callback in callbacks.iter() {
                callback.trigger(&ctx, &task).await;
            }
        });
    }
}
