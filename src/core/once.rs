//! # At-most-once failure capture for concurrent workers.
//!
//! [`FirstError`] pairs a single-assignment slot with the cancellation token
//! shared by sibling workers. The first worker to report a failure stores its
//! error and cancels the token; every later report is ignored.
//!
//! ```text
//! worker A ──► capture(e1) ──► slot = e1, token.cancel()   (wins)
//! worker B ──► capture(e2) ──► ignored                      (slot already set)
//! ```

use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Single-assignment error slot that cancels `token` on first capture.
#[derive(Debug)]
pub(crate) struct FirstError {
    slot: OnceLock<TaskError>,
    token: CancellationToken,
}

impl FirstError {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self {
            slot: OnceLock::new(),
            token,
        }
    }

    /// Stores `err` and cancels the token if no error was captured yet.
    ///
    /// Returns `true` for the winning call.
    pub(crate) fn capture(&self, err: TaskError) -> bool {
        let won = self.slot.set(err).is_ok();
        if won {
            self.token.cancel();
        }
        won
    }

    /// Returns the captured error.
    pub(crate) fn get(&self) -> Option<&TaskError> {
        self.slot.get()
    }
}
