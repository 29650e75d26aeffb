//! Lease-driven re-fetching of secrets.
//!
//! Every secret gets its own poll task: fetch (retrying with a fixed delay),
//! publish, sleep for half the lease, repeat. Secrets without a lease are
//! fetched once. A coordinator task keeps the latest value of each secret and,
//! once all of them are known, coalesces updates over a bounded debounce
//! window. The merged mapping is emitted only when it differs from the last
//! one emitted.
//!
//! All tasks live in a [`JoinSet`] owned by [`SecretWatcher`]; dropping the
//! watcher aborts them.

use crate::descriptor::ResolvedSecret;
use crate::orchestrator::Orchestrator;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant};
use vault_env_core::{EnvironmentVariables, Error, DEFAULT_DEBOUNCE};
use vault_env_utils::{humanize, retry_with_notify, RetryConfig};

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub retry: RetryConfig,
    /// Coalescing window, measured from the first update after a quiet period
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug)]
pub enum WatchEvent {
    /// The merged environment changed; the first event carries the initial one
    Changed(EnvironmentVariables),
    /// A fetch failed and will be retried
    Retrying {
        path: String,
        attempt: u32,
        delay: Duration,
        message: String,
    },
    /// Terminal failure; no further events follow for that secret
    Failed(Error),
}

type Update = (usize, EnvironmentVariables);

pub struct SecretWatcher {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    tasks: JoinSet<()>,
}

impl SecretWatcher {
    /// Start polling `secrets`. Must be called within a tokio runtime.
    pub fn spawn(
        orchestrator: Arc<Orchestrator>,
        secrets: Vec<ResolvedSecret>,
        config: WatchConfig,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        tracing::info!(
            target: "watcher",
            secrets = secrets.len(),
            debounce = %humanize(config.debounce),
            "Watching secrets"
        );

        tasks.spawn(coordinate(
            secrets.len(),
            updates_rx,
            events_tx.clone(),
            config.debounce,
        ));

        for (index, secret) in secrets.into_iter().enumerate() {
            tasks.spawn(poll_secret(
                index,
                secret,
                Arc::clone(&orchestrator),
                config.retry,
                updates_tx.clone(),
                events_tx.clone(),
            ));
        }

        Self { events, tasks }
    }

    /// Next event, or `None` once every task has finished
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Abort every task now instead of on drop
    pub fn shutdown(&mut self) {
        self.tasks.abort_all();
    }
}

impl Drop for SecretWatcher {
    fn drop(&mut self) {
        self.tasks.abort_all();
    }
}

async fn poll_secret(
    index: usize,
    secret: ResolvedSecret,
    orchestrator: Arc<Orchestrator>,
    retry: RetryConfig,
    updates: mpsc::UnboundedSender<Update>,
    events: mpsc::UnboundedSender<WatchEvent>,
) {
    let path = secret.path().to_string();

    loop {
        let fetched = retry_with_notify(
            &retry,
            || orchestrator.fetch_raw(&secret),
            |attempt| {
                tracing::warn!(
                    target: "watcher",
                    path = %path,
                    attempt = attempt.attempt,
                    "Failed to fetch secret, retrying in {}: {}",
                    humanize(attempt.delay),
                    attempt.error
                );
                let _ = events.send(WatchEvent::Retrying {
                    path: path.clone(),
                    attempt: attempt.attempt,
                    delay: attempt.delay,
                    message: attempt.error.to_string(),
                });
            },
        )
        .await;

        let (raw, lease) = match fetched {
            Ok(fetched) => fetched,
            Err((attempts, error)) => {
                let cause = match error {
                    Error::SecretFetch { source, .. } => *source,
                    other => other,
                };
                let error = Error::retry_exhausted(&path, attempts, cause);
                tracing::error!(target: "watcher", path = %path, "{error}");
                let _ = events.send(WatchEvent::Failed(error));
                return;
            }
        };

        let env = match raw.format(&secret) {
            Ok(env) => env,
            Err(error) => {
                tracing::error!(target: "watcher", path = %path, "{error}");
                let _ = events.send(WatchEvent::Failed(error));
                return;
            }
        };

        if updates.send((index, env)).is_err() {
            return;
        }

        match lease {
            Some(lease) => {
                let renew_after = lease.renew_after();
                tracing::info!(
                    target: "watcher",
                    path = %path,
                    "Renewing secret in {}",
                    humanize(renew_after)
                );
                sleep(renew_after).await;
            }
            None => {
                tracing::debug!(
                    target: "watcher",
                    path = %path,
                    "Secret has no lease, not watching it any further"
                );
                return;
            }
        }
    }
}

async fn coordinate(
    count: usize,
    mut updates: mpsc::UnboundedReceiver<Update>,
    events: mpsc::UnboundedSender<WatchEvent>,
    debounce: Duration,
) {
    if count == 0 {
        let _ = events.send(WatchEvent::Changed(EnvironmentVariables::new()));
        return;
    }

    let mut latest: Vec<Option<EnvironmentVariables>> = vec![None; count];
    let mut last_emitted: Option<EnvironmentVariables> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let armed = deadline;
        let timer = async move {
            match armed {
                Some(at) => sleep_until(at).await,
                None => pending().await,
            }
        };

        tokio::select! {
            update = updates.recv() => match update {
                Some((index, env)) => {
                    latest[index] = Some(env);
                    if deadline.is_none() && latest.iter().all(Option::is_some) {
                        deadline = Some(Instant::now() + debounce);
                    }
                }
                None => {
                    if deadline.is_some() {
                        flush(&latest, &mut last_emitted, &events);
                    }
                    return;
                }
            },
            () = timer => {
                deadline = None;
                if !flush(&latest, &mut last_emitted, &events) {
                    return;
                }
            }
        }
    }
}

/// Merge the cached values and emit them if they changed. Returns `false`
/// once nobody listens anymore.
fn flush(
    latest: &[Option<EnvironmentVariables>],
    last_emitted: &mut Option<EnvironmentVariables>,
    events: &mpsc::UnboundedSender<WatchEvent>,
) -> bool {
    let merged = EnvironmentVariables::merge_all(latest.iter().flatten().cloned());

    if last_emitted.as_ref() == Some(&merged) {
        tracing::debug!(target: "watcher", "Secrets unchanged");
        return true;
    }

    *last_emitted = Some(merged.clone());
    events.send(WatchEvent::Changed(merged)).is_ok()
}
