//! Bounded, immediate retry of a single remediation action.
//!
//! No backoff: authority calls are assumed fast and idempotent, so a failed
//! action is retried on the spot until it succeeds or `max_retries` failures
//! have piled up.

use tracing::debug;

use crate::core::errors::{Result, SentinelError};

/// How an action fared after the retry loop.
#[derive(Debug)]
pub enum RetryOutcome {
    /// Accepted on attempt number `attempts` (1-based).
    Succeeded { attempts: u32 },
    /// `attempts` consecutive failures; `last_error` is the final one.
    Exhausted {
        attempts: u32,
        last_error: SentinelError,
    },
}

impl RetryOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Retry budget for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// `max_retries` is clamped to at least one attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub const fn max_retries(self) -> u32 {
        self.max_retries
    }

    /// Drive `attempt` against the caller's persistent retry counter.
    ///
    /// `attempt` receives the counter value at the moment of the call, which is
    /// always below `max_retries`. Each failure bumps the counter; success or
    /// exhaustion resets it to zero.
    pub fn run<F>(self, retry_count: &mut u32, mut attempt: F) -> RetryOutcome
    where
        F: FnMut(u32) -> Result<()>,
    {
        // A stale counter from an earlier ladder must not skip the first try.
        if *retry_count >= self.max_retries {
            *retry_count = 0;
        }
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match attempt(*retry_count) {
                Ok(()) => {
                    *retry_count = 0;
                    return RetryOutcome::Succeeded { attempts };
                }
                Err(err) => {
                    *retry_count += 1;
                    if *retry_count >= self.max_retries {
                        *retry_count = 0;
                        return RetryOutcome::Exhausted {
                            attempts,
                            last_error: err,
                        };
                    }
                    debug!(
                        attempt = attempts,
                        retries = *retry_count,
                        max = self.max_retries,
                        error = %err,
                        "action failed, retrying"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail() -> Result<()> {
        Err(SentinelError::action("k", "alert", "authority said no"))
    }

    #[test]
    fn first_try_success() {
        let mut retries = 0;
        let outcome = RetryPolicy::new(3).run(&mut retries, |_| Ok(()));
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(retries, 0);
    }

    #[test]
    fn fail_fail_succeed() {
        let mut retries = 0;
        let mut seen = Vec::new();
        let mut calls = 0;
        let outcome = RetryPolicy::new(3).run(&mut retries, |r| {
            seen.push(r);
            calls += 1;
            if calls < 3 { fail() } else { Ok(()) }
        });
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(retries, 0);
    }

    #[test]
    fn exhaustion_after_max_failures() {
        let mut retries = 0;
        let mut seen = Vec::new();
        let outcome = RetryPolicy::new(3).run(&mut retries, |r| {
            seen.push(r);
            fail()
        });
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error.code(), "SNT-2002");
            }
            RetryOutcome::Succeeded { .. } => panic!("expected exhaustion"),
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(retries, 0);
    }

    #[test]
    fn zero_budget_still_attempts_once() {
        let mut retries = 0;
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.max_retries(), 1);
        let outcome = policy.run(&mut retries, |_| fail());
        assert_eq!(outcome.attempts(), 1);
        assert!(!outcome.is_success());
    }

    #[test]
    fn stale_counter_is_reset_before_attempting() {
        let mut retries = 7;
        let mut first = None;
        RetryPolicy::new(3).run(&mut retries, |r| {
            first.get_or_insert(r);
            Ok(())
        });
        assert_eq!(first, Some(0));
    }
}
