//! Wiring of secrets, watcher and supervisor into one run

use std::future::pending;
use std::sync::Arc;
use tokio::sync::mpsc;
use vault_env_config::Config;
use vault_env_core::{EnvironmentVariables, Error, Result, Signal};
use vault_env_secrets::{Orchestrator, SecretWatcher, VaultClient, WatchConfig, WatchEvent};
use vault_env_supervisor::{
    ChildProcessHandle, CommandSpec, ExitReport, ProcessSupervisor, SignalRelay, SpawnOptions,
    StdioMode,
};

/// Sends signals to whatever child is current; a no-op when there is none
#[derive(Debug, Clone)]
pub struct KillHandle {
    tx: mpsc::UnboundedSender<Signal>,
}

impl KillHandle {
    pub fn kill(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!(target: "runner", signal = signal.name(), "Runner is gone, ignoring signal");
        }
    }
}

/// Runs a command with secrets injected, once or under watch
pub struct VaultEnv {
    config: Config,
    command: CommandSpec,
    orchestrator: Arc<Orchestrator>,
    stdio: StdioMode,
    forward_signals: bool,
    kill_tx: mpsc::UnboundedSender<Signal>,
    kill_rx: mpsc::UnboundedReceiver<Signal>,
}

impl VaultEnv {
    /// Build the store client described by `config`
    pub fn new(config: Config, command: CommandSpec) -> Result<Self> {
        let orchestrator = if config.dummy {
            Orchestrator::dummy()
        } else {
            let vault = config
                .vault
                .clone()
                .ok_or_else(|| Error::configuration("vault address is required"))?;
            let client = VaultClient::new(vault)?;
            tracing::info!(target: "runner", address = %client.address(), "Created vault api client");
            Orchestrator::new(Arc::new(client))
        };

        Ok(Self::with_orchestrator(config, command, orchestrator))
    }

    pub fn with_orchestrator(
        config: Config,
        command: CommandSpec,
        orchestrator: Orchestrator,
    ) -> Self {
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        Self {
            config,
            command,
            orchestrator: Arc::new(orchestrator),
            stdio: StdioMode::Inherit,
            forward_signals: true,
            kill_tx,
            kill_rx,
        }
    }

    #[must_use]
    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Whether the parent's termination signals reach the child. Once mode
    /// subscribes per child; watch mode queues them for whichever child is
    /// current, so none is lost during a restart.
    #[must_use]
    pub fn forward_signals(mut self, forward: bool) -> Self {
        self.forward_signals = forward;
        self
    }

    pub fn kill_handle(&self) -> KillHandle {
        KillHandle {
            tx: self.kill_tx.clone(),
        }
    }

    /// Run until the child exits and return the exit code for the parent.
    ///
    /// Errors mean no child was left running: resolution failed before the
    /// first spawn, or watch mode gave up.
    pub async fn run(self) -> Result<i32> {
        let supervisor = ProcessSupervisor::new(
            self.command.clone(),
            SpawnOptions {
                cwd: Some(self.config.cwd.clone()),
                stdio: self.stdio,
                kill_signal: self.config.kill_signal,
                forward_signals: self.forward_signals && !self.config.watch,
            },
        );

        let report = if self.config.watch {
            self.run_watch(&supervisor).await?
        } else {
            self.run_once(&supervisor).await?
        };

        tracing::info!(
            target: "runner",
            "child process has finished execution. code={} signal={}",
            report.code.map_or_else(|| "None".to_string(), |c| c.to_string()),
            report.signal_name().unwrap_or("None")
        );
        Ok(report.exit_code())
    }

    async fn run_once(mut self, supervisor: &ProcessSupervisor) -> Result<ExitReport> {
        let env = self
            .orchestrator
            .resolve_environment(&self.config.secrets)
            .await?;

        let mut child = start(supervisor, &env);
        loop {
            tokio::select! {
                report = child.wait() => return Ok(report),
                Some(signal) = self.kill_rx.recv() => forward(&child, signal),
            }
        }
    }

    async fn run_watch(mut self, supervisor: &ProcessSupervisor) -> Result<ExitReport> {
        // Parent signals outlive any single child: queued here, they reach
        // whichever child is current once a restart has finished.
        let (signals_tx, mut signals_rx) = mpsc::unbounded_channel();
        let _relay = self
            .forward_signals
            .then(|| SignalRelay::install(signals_tx));

        let mut watcher = SecretWatcher::spawn(
            Arc::clone(&self.orchestrator),
            self.config.secrets.clone(),
            WatchConfig {
                retry: self.config.retry,
                debounce: self.config.debounce,
            },
        );

        let mut child: Option<ChildProcessHandle> = None;
        let mut watching = true;

        loop {
            tokio::select! {
                event = watcher.next_event(), if watching => match event {
                    Some(WatchEvent::Changed(env)) => {
                        if let Some(mut old) = child.take() {
                            tracing::info!(target: "runner", "Secrets changed, restarting child process");
                            old.stop().await;
                        }
                        child = Some(start(supervisor, &env));
                    }
                    Some(WatchEvent::Retrying { .. }) => {}
                    Some(WatchEvent::Failed(error)) => {
                        watcher.shutdown();
                        if let Some(mut old) = child.take() {
                            old.stop().await;
                        }
                        return Err(error);
                    }
                    None => {
                        watching = false;
                        if child.is_none() {
                            return Err(Error::configuration(
                                "watcher stopped before any environment was resolved",
                            ));
                        }
                        tracing::debug!(target: "runner", "Nothing left to watch");
                    }
                },
                report = wait_child(&mut child) => return Ok(report),
                Some(signal) = self.kill_rx.recv() => match &child {
                    Some(current) => forward(current, signal),
                    None => tracing::debug!(
                        target: "runner",
                        signal = signal.name(),
                        "No child process running, ignoring signal"
                    ),
                },
                Some(signal) = signals_rx.recv() => match &child {
                    Some(current) => forward(current, signal),
                    None => {
                        return Err(Error::signal(
                            signal.name(),
                            "received before the child process was started",
                        ))
                    }
                },
            }
        }
    }
}

fn start(supervisor: &ProcessSupervisor, env: &EnvironmentVariables) -> ChildProcessHandle {
    let child = supervisor.spawn(env);
    tracing::info!(
        target: "runner",
        "running {} (pid {})",
        supervisor.command().display(),
        child.pid().map_or_else(|| "None".to_string(), |p| p.to_string())
    );
    child
}

fn forward(child: &ChildProcessHandle, signal: Signal) {
    tracing::debug!(target: "runner", "send signal {} for pid {:?}", signal.name(), child.pid());
    if let Err(e) = child.signal(signal) {
        tracing::warn!(target: "runner", "{e}");
    }
}

/// Resolves when the current child exits; never while there is none
async fn wait_child(child: &mut Option<ChildProcessHandle>) -> ExitReport {
    match child {
        Some(child) => child.wait().await,
        None => pending().await,
    }
}
