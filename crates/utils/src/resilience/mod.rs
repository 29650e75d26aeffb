//! Resilience patterns for recovering from transient failures.
//!
//! Watch mode retries failed secret fetches with a fixed delay between
//! attempts and gives up after a bounded number of retries.
//!
//! - [`config`] - retry policy configuration
//! - [`retry`] - retry loop with attempt notifications

pub mod config;
pub mod retry;

pub use config::{RetryConfig, RetryDecision};
pub use retry::{retry_with_notify, RetryAttempt};
