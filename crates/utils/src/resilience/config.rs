//! Configuration for retry behavior.

use std::time::Duration;
use vault_env_core::{DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL};

/// Fixed-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay between a failure and the next attempt
    pub interval: Duration,
    /// Number of retries allowed after the first failure
    pub max_attempts: u32,
}

/// What to do after the `attempt`-th consecutive failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

impl RetryConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// `retries_done` is the number of retries already performed since the
    /// last success.
    pub fn decide(&self, retries_done: u32) -> RetryDecision {
        if retries_done >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                delay: self.interval,
            }
        }
    }
}
