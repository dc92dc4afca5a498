//! # Execution core.
//!
//! - [`Executor`] runs one task under a [`Policy`](crate::Policy) with retries and compensation.
//! - [`Info`] holds metadata and lifecycle [`State`] of executors, flows and TCC nodes.
//! - `FirstError` captures the first failure of concurrent workers exactly once.

mod executor;
mod info;
mod once;

pub use executor::Executor;
pub(crate) use once::FirstError;
pub use info::{Info, InfoSnapshot, State};
