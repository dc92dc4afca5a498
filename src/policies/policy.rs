//! # Failure-handling policies.
//!
//! [`Policy`] decides what the executor does once a task's commit has failed.
//!
//! - [`Policy::Retry`] re-attempts the commit with bounded backoff, then compensates.
//! - [`Policy::Revert`] compensates this unit immediately (no retry).
//! - [`Policy::RevertAll`] compensates immediately and forces compensation of the
//!   whole enclosing flow.
//!
//! ## Resolution inside flows
//! ```text
//! flow policy ──► effective policy for member i
//!                   ├─ member (or an earlier member, sequential) declares RevertAll ─► RevertAll
//!                   └─ otherwise                                                   ─► flow policy
//! ```
//! A member can only escalate to [`Policy::RevertAll`]; it can never ask for
//! [`Policy::Retry`] on its own. The variants are a selector, not a priority:
//! no ordering between them is implied.

/// Failure-handling mode applied by the executor after a failed commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Reattempt the commit before compensating.
    Retry,
    /// Compensate this unit only.
    Revert,
    /// Compensate this unit and force compensation across the enclosing flow.
    RevertAll,
}

impl Policy {
    /// Resolves the policy a flow member runs with.
    ///
    /// `declared` is what the member asks for; only `RevertAll` is honoured.
    /// `escalated` is set once an earlier member of a sequential flow declared `RevertAll`.
    pub fn resolve(self, declared: Option<Policy>, escalated: bool) -> Policy {
        if escalated || declared == Some(Policy::RevertAll) {
            Policy::RevertAll
        } else {
            self
        }
    }

    /// Returns `true` if the executor should retry before compensating.
    #[inline]
    pub fn retries(self) -> bool {
        matches!(self, Policy::Retry)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Policy::Retry => "retry",
            Policy::Revert => "revert",
            Policy::RevertAll => "revert_all",
        }
    }
}
