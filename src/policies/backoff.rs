//! # Bounded exponential backoff.
//!
//! [`BackoffPolicy`] is parameterized by:
//! - [`BackoffPolicy::attempts`] the retry cap;
//! - [`BackoffPolicy::interval`] the base (first) delay.
//!
//! [`BackoffPolicy::generator`] turns it into a [`Backoff`] iterator. With fewer
//! than two attempts or a zero interval the generator is [`Backoff::Zero`]
//! (retry immediately). Otherwise the delay for retry `n` (0-indexed) is
//! `interval × m^n` with `m = 2^(1/(attempts-1))`, clamped to `2 × interval`.
//!
//! Compounding `m` over `attempts - 1` steps yields exactly `2×`, so the total
//! growth is capped no matter how many attempts are configured, and the sum of
//! the first `attempts` delays never exceeds `2 × interval × attempts`.
//!
//! Like the attempt-indexed formula it is derived from, each delay is computed
//! from the attempt number alone; nothing feeds back between calls.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use sagaflow::BackoffPolicy;
//!
//! let policy = BackoffPolicy::new(3, Duration::from_millis(100));
//! let delays: Vec<Duration> = policy.generator().take(4).collect();
//!
//! // m = 2^(1/2): 100ms, ~141ms, 200ms, then clamped at 200ms
//! assert_eq!(delays[0], Duration::from_millis(100));
//! assert!(delays[1] > delays[0] && delays[1] < delays[2]);
//! assert_eq!(delays[2], Duration::from_millis(200));
//! assert_eq!(delays[3], Duration::from_millis(200));
//! ```

use std::time::Duration;

/// Retry cap and base interval for a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of retries after the first failed commit.
    pub attempts: u32,
    /// Base delay before the first retry.
    pub interval: Duration,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `attempts = 3`;
    /// - `interval = 100ms`.
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_millis(100),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with the given retry cap and base interval.
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Builds a fresh (already reset) delay generator.
    pub fn generator(&self) -> Backoff {
        if self.attempts < 2 || self.interval.is_zero() {
            return Backoff::Zero;
        }
        let multiplier = 2f64.powf(1.0 / f64::from(self.attempts - 1));
        let mut backoff = Backoff::Exponential {
            base: self.interval,
            max: self.interval.saturating_mul(2),
            multiplier,
            ceiling: self.attempts - 1,
            attempt: 0,
        };
        backoff.reset();
        backoff
    }
}

/// Delay generator produced by [`BackoffPolicy::generator`].
///
/// Infinite iterator: every call to `next()` yields `Some(delay)`, and
/// successive delays never decrease.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    Zero,
    /// Bounded exponential growth from `base` up to `max`.
    Exponential {
        /// First delay.
        base: Duration,
        /// Upper bound (`2 × base`).
        max: Duration,
        /// Growth factor per retry.
        multiplier: f64,
        /// Retry index from which `max` is returned as is.
        ceiling: u32,
        /// Number of delays produced since the last reset.
        attempt: u32,
    },
}

impl Backoff {
    /// Rewinds the generator to its first delay.
    pub fn reset(&mut self) {
        if let Backoff::Exponential { attempt, .. } = self {
            *attempt = 0;
        }
    }

    /// Returns the growth factor (`1.0` for [`Backoff::Zero`]).
    pub fn multiplier(&self) -> f64 {
        match self {
            Backoff::Zero => 1.0,
            Backoff::Exponential { multiplier, .. } => *multiplier,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        match self {
            Backoff::Zero => Some(Duration::ZERO),
            Backoff::Exponential {
                base,
                max,
                multiplier,
                ceiling,
                attempt,
            } => {
                let n = *attempt;
                *attempt = attempt.saturating_add(1);

                if n == 0 {
                    return Some(*base);
                }
                if n >= *ceiling {
                    return Some(*max);
                }
                let secs = base.as_secs_f64() * multiplier.powi(n.min(i32::MAX as u32) as i32);
                let delay = if secs.is_finite() {
                    Duration::from_secs_f64(secs)
                } else {
                    *max
                };
                Some(delay.clamp(*base, *max))
            }
        }
    }
}
