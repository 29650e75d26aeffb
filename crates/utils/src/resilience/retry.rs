//! Retry loop for resilient operations.

use super::config::{RetryConfig, RetryDecision};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use vault_env_core::{Error, Result};

/// Details about a failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a> {
    /// 1-based number of the upcoming retry
    pub attempt: u32,
    pub delay: Duration,
    pub error: &'a Error,
}

/// Run `operation` until it succeeds or the policy gives up.
///
/// `notify` is called before every sleep, so callers can report that a
/// failure is still transient. When the policy gives up, the last error is
/// returned unchanged; wrapping it is up to the caller.
pub async fn retry_with_notify<F, Fut, T, N>(
    config: &RetryConfig,
    mut operation: F,
    mut notify: N,
) -> std::result::Result<T, (u32, Error)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    N: FnMut(RetryAttempt<'_>),
{
    let mut retries_done = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retries_done > 0 {
                    tracing::info!("Operation succeeded after {retries_done} retries");
                }
                return Ok(result);
            }
            Err(error) => match config.decide(retries_done) {
                RetryDecision::Retry { delay } => {
                    retries_done += 1;
                    notify(RetryAttempt {
                        attempt: retries_done,
                        delay,
                        error: &error,
                    });
                    sleep(delay).await;
                }
                RetryDecision::GiveUp => return Err((retries_done, error)),
            },
        }
    }
}
