//! Failure and retry policies.
//!
//! This module groups the knobs that control **what** happens after a failed
//! commit and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`Policy`]        retry / revert / revert-all selector
//! - [`BackoffPolicy`] retry cap and base interval
//! - [`Backoff`]       delay generator derived from a [`BackoffPolicy`]
//!
//! ## Quick wiring
//! ```text
//! Config { policy, attempts, interval }
//!      └─► Executor uses:
//!           - policy to decide retry vs. compensate
//!           - BackoffPolicy::generator().next() to schedule each retry
//! ```

mod backoff;
mod policy;

pub use backoff::{Backoff, BackoffPolicy};
pub use policy::Policy;
