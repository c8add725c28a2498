//! Retry policy with randomized backoff for catalog requests.
//!
//! One [`RetryPolicy`] type drives every retry loop in the crate: the
//! safe-fetch primitive that issues individual requests and each of the
//! three protocol stages that wrap it. Stages differ only in the policy
//! values they are configured with.
//!
//! When an attempt fails, its error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts, transport errors, non-success
//!   status, pages that loaded but did not contain what the stage needed
//! - [`FailureType::Challenge`] - an anti-bot interstitial page was served
//! - [`FailureType::Permanent`] - retrying cannot help (malformed URL, client
//!   construction failure)
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use subgrab_core::retry::{Backoff, FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Backoff::fixed(Duration::from_millis(10)));
//!
//! match policy.should_retry(FailureType::Transient, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Default attempts for a single safe-fetch request.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 5;

/// Default attempts for each protocol stage.
pub const DEFAULT_STAGE_ATTEMPTS: u32 = 3;

/// Backoff after a transport error or non-success status.
const FETCH_BACKOFF: Backoff = Backoff::between(Duration::from_millis(800), Duration::from_millis(1600));

/// Backoff after an anti-bot challenge page.
const CHALLENGE_BACKOFF: Backoff =
    Backoff::between(Duration::from_millis(1200), Duration::from_millis(2000));

/// Delay between stage attempts.
const STAGE_BACKOFF: Backoff = Backoff::between(Duration::from_secs(1), Duration::from_secs(2));

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The attempt may succeed if repeated.
    Transient,

    /// The catalog served an interstitial verification page.
    ///
    /// Retryable, with its own backoff range.
    Challenge,

    /// Repeating the attempt would not help.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Give up.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Uniformly distributed delay range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// Delay drawn uniformly from `min..=max`. Bounds are swapped if reversed.
    #[must_use]
    pub const fn between(min: Duration, max: Duration) -> Self {
        if min.as_nanos() > max.as_nanos() {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Constant delay.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// No delay at all.
    #[must_use]
    pub const fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws one delay from the range.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }
}

/// Retry configuration: attempt ceiling plus backoff ranges per failure class.
///
/// # Default Values
///
/// The default is the stage policy:
/// - `max_attempts`: 3
/// - `backoff`: 1.0 - 2.0 seconds
/// - `challenge_backoff`: same as `backoff`
///
/// [`RetryPolicy::fetch_default`] gives the safe-fetch policy: 5 attempts,
/// 0.8 - 1.6 seconds after errors, 1.2 - 2.0 seconds after challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay after a transient failure.
    backoff: Backoff,

    /// Delay after an anti-bot challenge.
    challenge_backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_STAGE_ATTEMPTS,
            backoff: STAGE_BACKOFF,
            challenge_backoff: STAGE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy using `backoff` for every retryable failure class.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            challenge_backoff: backoff,
        }
    }

    /// The safe-fetch policy used for individual catalog requests.
    #[must_use]
    pub fn fetch_default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
            backoff: FETCH_BACKOFF,
            challenge_backoff: CHALLENGE_BACKOFF,
        }
    }

    /// Overrides the delay used after challenge pages.
    #[must_use]
    pub fn with_challenge_backoff(mut self, backoff: Backoff) -> Self {
        self.challenge_backoff = backoff;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        let backoff = match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient => self.backoff,
            FailureType::Challenge => self.challenge_backoff,
        };

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = backoff.sample();
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            ?failure_type,
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff.min(), Duration::from_secs(1));
        assert_eq!(policy.backoff.max(), Duration::from_secs(2));
    }

    #[test]
    fn test_fetch_policy_defaults() {
        let policy = RetryPolicy::fetch_default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.backoff.min(), Duration::from_millis(800));
        assert_eq!(policy.challenge_backoff.max(), Duration::from_millis(2000));
    }

    #[test]
    fn test_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::new(0, Backoff::none());
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_backoff_sample_within_bounds() {
        let backoff = Backoff::between(Duration::from_millis(800), Duration::from_millis(1600));
        for _ in 0..200 {
            let delay = backoff.sample();
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1600));
        }
    }

    #[test]
    fn test_backoff_between_swaps_reversed_bounds() {
        let backoff = Backoff::between(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(backoff.min(), Duration::from_secs(1));
        assert_eq!(backoff.max(), Duration::from_secs(2));
    }

    #[test]
    fn test_permanent_does_not_retry() {
        let policy = RetryPolicy::default();
        let decision = policy.should_retry(FailureType::Permanent, 1);
        if let RetryDecision::DoNotRetry { reason } = decision {
            assert!(reason.contains("permanent"));
        } else {
            panic!("expected DoNotRetry, got {decision:?}");
        }
    }

    #[test]
    fn test_transient_and_challenge_retry_until_exhausted() {
        let policy = RetryPolicy::new(3, Backoff::fixed(Duration::from_millis(5)));

        for failure in [FailureType::Transient, FailureType::Challenge] {
            assert_eq!(
                policy.should_retry(failure, 1),
                RetryDecision::Retry {
                    delay: Duration::from_millis(5),
                    attempt: 2
                }
            );
            assert!(matches!(
                policy.should_retry(failure, 2),
                RetryDecision::Retry { attempt: 3, .. }
            ));
            let last = policy.should_retry(failure, 3);
            if let RetryDecision::DoNotRetry { reason } = last {
                assert!(reason.contains("exhausted"));
            } else {
                panic!("expected DoNotRetry at max attempts, got {last:?}");
            }
        }
    }

    #[test]
    fn test_challenge_uses_its_own_backoff() {
        let policy = RetryPolicy::new(5, Backoff::fixed(Duration::from_millis(1)))
            .with_challenge_backoff(Backoff::fixed(Duration::from_millis(7)));

        assert!(matches!(
            policy.should_retry(FailureType::Challenge, 1),
            RetryDecision::Retry { delay, .. } if delay == Duration::from_millis(7)
        ));
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 1),
            RetryDecision::Retry { delay, .. } if delay == Duration::from_millis(1)
        ));
    }
}
