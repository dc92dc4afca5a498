//! # Delay scheduler.
//!
//! - [`Wheel`]: the slot ring (pure, one call per tick).
//! - [`TimeWheel`]: the tokio control loop driving a [`Wheel`] and delivering
//!   fired [`DelayTask`]s to [`TimerCallback`]s.

mod slots;
mod timer;

pub use slots::{DelayTask, Wheel};
pub use timer::{
    TimeWheel, TimeWheelBuilder, TimerCallback, TimerCallbackRef, WheelConfig, WheelHandle,
};
