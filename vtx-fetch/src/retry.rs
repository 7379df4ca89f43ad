//! Retry policy for credential refresh.

use std::time::Duration;

/// How often a failed refresh is retried, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryStrategy {
    /// One retry after a fixed one-second pause.
    pub fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(1),
        }
    }

    /// True if another attempt is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::single_retry()
    }
}
