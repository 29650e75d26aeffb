//! Relaying parent signals to the running child

use crate::supervisor::ChildState;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vault_env_core::{Error, Result, Signal, FORWARDED_SIGNALS};

/// Signals relayed to the child while it runs
pub fn forwarded_signals() -> Vec<Signal> {
    FORWARDED_SIGNALS
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect()
}

/// Send `sig` to `pid`, but only while `state` says the child is running
pub(crate) fn deliver(pid: u32, sig: Signal, state: &Mutex<ChildState>) -> Result<bool> {
    let state = state.lock();
    if *state != ChildState::Running {
        return Ok(false);
    }

    // The lock only orders delivery against the waiter publishing Exited.
    // The waiter reaps before taking it, so a signal racing the exit can
    // still target a pid that was just collected.
    let rc = unsafe { libc::kill(pid as libc::pid_t, sig.as_raw()) };
    if rc == 0 {
        Ok(true)
    } else {
        Err(Error::signal(
            sig.name(),
            format!("failed to signal pid {pid}: {}", io::Error::last_os_error()),
        ))
    }
}

/// Subscribe to every forwarded signal and call `on_signal` for each one
/// received. Handlers are registered before this returns.
fn subscribe<F>(on_signal: F) -> Vec<JoinHandle<()>>
where
    F: Fn(Signal) + Clone + Send + 'static,
{
    let mut tasks = Vec::new();

    for sig in forwarded_signals() {
        let mut stream = match signal(SignalKind::from_raw(sig.as_raw())) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(
                    target: "supervisor",
                    signal = sig.name(),
                    "Cannot listen for signal: {e}"
                );
                continue;
            }
        };

        let on_signal = on_signal.clone();
        tasks.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                tracing::info!(target: "supervisor", "receive {} signal.", sig.name());
                on_signal(sig);
            }
        }));
    }

    tasks
}

/// Subscription to the parent's termination signals for one child.
///
/// Handlers are registered when the forwarder is installed; dropping it
/// stops relaying.
pub struct SignalForwarder {
    tasks: Vec<JoinHandle<()>>,
}

impl SignalForwarder {
    /// Must be called within a tokio runtime
    pub fn install(pid: u32, state: Arc<Mutex<ChildState>>) -> Self {
        let tasks = subscribe(move |sig| match deliver(pid, sig, &state) {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                target: "supervisor",
                signal = sig.name(),
                "Child is not running, dropping signal"
            ),
            Err(e) => tracing::warn!(target: "supervisor", "{e}"),
        });

        Self { tasks }
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Queues the parent's termination signals instead of delivering them.
///
/// Used when children are replaced over time: the receiver of the queue
/// decides which child is current, so a signal arriving between two
/// children is held rather than lost.
pub struct SignalRelay {
    tasks: Vec<JoinHandle<()>>,
}

impl SignalRelay {
    /// Must be called within a tokio runtime
    pub fn install(queue: mpsc::UnboundedSender<Signal>) -> Self {
        let tasks = subscribe(move |sig| {
            if queue.send(sig).is_err() {
                tracing::debug!(
                    target: "supervisor",
                    signal = sig.name(),
                    "Nobody is listening, dropping signal"
                );
            }
        });

        Self { tasks }
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
