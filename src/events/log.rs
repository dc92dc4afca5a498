//! # LogWriter — event logger
//!
//! A minimal notifier that forwards incoming [`Event`]s to `tracing`.
//! Failures are logged at `warn`, everything else at `info`; progress reports
//! at `debug`.
//!
//! ## Example output
//! ```text
//! INFO  sagaflow: task called reserve starts running seq=0 task="reserve"
//! WARN  sagaflow: task called reserve commits appears out of stock seq=1 task="reserve"
//! INFO  sagaflow: task called reserve retries in 100ms (attempt 1) seq=2 task="reserve"
//! ```

use tokio_util::sync::CancellationToken;

use crate::events::{Event, Notifier};

/// Event writer notifier.
#[derive(Default, Clone, Copy, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogWriter {
    fn event(&self, _ctx: &CancellationToken, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unknown");
        if e.is_failure() {
            tracing::warn!(seq = e.seq, task, "{e}");
        } else {
            tracing::info!(seq = e.seq, task, "{e}");
        }
    }

    fn notify(&self, _ctx: &CancellationToken, name: &str, progress: f32) {
        tracing::debug!(task = name, progress, "progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::events::testing::Captured;

    #[test]
    fn test_events_reach_tracing_with_level_by_outcome() {
        let out = Captured::default();
        let ctx = CancellationToken::new();

        tracing::subscriber::with_default(out.subscriber(), || {
            let log = LogWriter::new();
            log.event(&ctx, &Event::new(EventKind::TaskStarting).with_task("reserve"));
            log.event(
                &ctx,
                &Event::new(EventKind::CommitFailed)
                    .with_task("reserve")
                    .with_reason("out of stock"),
            );
            log.notify(&ctx, "reserve", 100.0);
        });

        let lines = out.lines();
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("task called reserve starts running"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[1].contains("task called reserve commits appears out of stock"));
        assert!(lines[2].contains("DEBUG"));
        assert!(lines[2].contains("progress=100"));
    }
}
