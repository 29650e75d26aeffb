//! Spawning, signalling and awaiting the supervised child

use crate::signals::{deliver, SignalForwarder};
use parking_lot::Mutex;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use vault_env_core::{
    EnvironmentVariables, Error, Result, Signal, EXIT_CODE_NOT_EXECUTABLE, EXIT_CODE_NOT_FOUND,
    EXIT_CODE_SPAWN_FAILED, SIGNALED_EXIT_CODE,
};
use vault_env_utils::describe_environment;

/// Program and arguments to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program and arguments joined by spaces, for logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where the child's standard streams go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdioMode {
    /// Share the parent's stdin, stdout and stderr
    #[default]
    Inherit,
    /// Null stdin, captured stdout and stderr
    Piped,
}

#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub cwd: Option<PathBuf>,
    pub stdio: StdioMode,
    /// Signal used by [`ChildProcessHandle::stop`]
    pub kill_signal: Signal,
    pub forward_signals: bool,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            stdio: StdioMode::Inherit,
            kill_signal: Signal::Term,
            forward_signals: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    NotStarted,
    Running,
    Exited,
}

/// How the child ended. `code` is `None` when a signal killed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitReport {
    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }

    fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Exit code for the parent; signal deaths map to a fixed sentinel
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(SIGNALED_EXIT_CODE)
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Name of the killing signal when it is one we know
    pub fn signal_name(&self) -> Option<&'static str> {
        self.signal.and_then(Signal::from_raw).map(Signal::name)
    }
}

/// Starts children for one command with fixed options
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    command: CommandSpec,
    options: SpawnOptions,
}

impl ProcessSupervisor {
    pub fn new(command: CommandSpec, options: SpawnOptions) -> Self {
        Self { command, options }
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Start the child with `env` overlaid on the parent environment.
    ///
    /// A failed spawn is logged and surfaces as a handle that has already
    /// exited with 127 (not found), 126 (not executable) or 1. Must be
    /// called within a tokio runtime.
    pub fn spawn(&self, env: &EnvironmentVariables) -> ChildProcessHandle {
        let command_line = self.command.display();

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args).envs(env.iter());

        if let Some(cwd) = &self.options.cwd {
            cmd.current_dir(cwd);
        }

        match self.options.stdio {
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Piped => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        tracing::debug!(
            target: "supervisor",
            "Environment for child process:\n{}",
            describe_environment(env)
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let code = spawn_failure_code(&e);
                let error = Error::spawn(&command_line, e.to_string());
                tracing::error!(target: "supervisor", exit_code = code, "{error}");
                return ChildProcessHandle::failed(command_line, self.options.kill_signal, code);
            }
        };

        let pid = child.id();
        tracing::info!(target: "supervisor", pid, command = %command_line, "Spawned child process");

        let state = Arc::new(Mutex::new(ChildState::Running));
        let forwarder = match (self.options.forward_signals, pid) {
            (true, Some(pid)) => Some(SignalForwarder::install(pid, Arc::clone(&state))),
            _ => None,
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (exit_tx, exit_rx) = oneshot::channel();
        let waiter_state = Arc::clone(&state);
        let waiter_command = command_line.clone();
        tokio::spawn(async move {
            let report = match child.wait().await {
                Ok(status) => ExitReport::from_status(status),
                Err(e) => {
                    let error = Error::child_process(&waiter_command, e.to_string());
                    tracing::error!(target: "supervisor", "{error}");
                    ExitReport::failed(EXIT_CODE_SPAWN_FAILED)
                }
            };
            drop(forwarder);
            *waiter_state.lock() = ChildState::Exited;
            let _ = exit_tx.send(report);
        });

        ChildProcessHandle {
            command: command_line,
            pid,
            state,
            kill_signal: self.options.kill_signal,
            exit_rx: Some(exit_rx),
            report: None,
            stdout,
            stderr,
        }
    }
}

fn spawn_failure_code(error: &io::Error) -> i32 {
    match error.kind() {
        io::ErrorKind::NotFound => EXIT_CODE_NOT_FOUND,
        io::ErrorKind::PermissionDenied => EXIT_CODE_NOT_EXECUTABLE,
        _ => EXIT_CODE_SPAWN_FAILED,
    }
}

/// A started (or failed-to-start) child.
///
/// The exit is reported once by the waiter task and cached, so
/// [`wait`](Self::wait) can be called repeatedly and is cancel safe.
pub struct ChildProcessHandle {
    command: String,
    pid: Option<u32>,
    state: Arc<Mutex<ChildState>>,
    kill_signal: Signal,
    exit_rx: Option<oneshot::Receiver<ExitReport>>,
    report: Option<ExitReport>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ChildProcessHandle {
    fn failed(command: String, kill_signal: Signal, code: i32) -> Self {
        Self {
            command,
            pid: None,
            state: Arc::new(Mutex::new(ChildState::Exited)),
            kill_signal,
            exit_rx: None,
            report: Some(ExitReport::failed(code)),
            stdout: None,
            stderr: None,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> ChildState {
        *self.state.lock()
    }

    /// Whether the exit has been observed through [`wait`](Self::wait)
    pub fn exit_observed(&self) -> bool {
        self.report.is_some()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Send `sig` to the child. A no-op unless the child is running.
    pub fn signal(&self, sig: Signal) -> Result<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };

        if deliver(pid, sig, &self.state)? {
            tracing::debug!(target: "supervisor", pid, signal = sig.name(), "Signalled child process");
        }
        Ok(())
    }

    /// Wait for the child to exit
    pub async fn wait(&mut self) -> ExitReport {
        if let Some(report) = self.report {
            return report;
        }

        let report = match self.exit_rx.as_mut() {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                tracing::error!(
                    target: "supervisor",
                    command = %self.command,
                    "Lost track of child process"
                );
                ExitReport::failed(EXIT_CODE_SPAWN_FAILED)
            }),
            None => ExitReport::failed(EXIT_CODE_SPAWN_FAILED),
        };

        self.exit_rx = None;
        self.report = Some(report);

        match report.code {
            Some(code) => tracing::info!(
                target: "supervisor",
                command = %self.command,
                exit_code = code,
                "Child process exited"
            ),
            None => tracing::info!(
                target: "supervisor",
                command = %self.command,
                signal = report.signal_name().unwrap_or("unknown"),
                "Child process was killed by a signal"
            ),
        }

        report
    }

    /// Stop the child with the configured kill signal and wait for it
    pub async fn stop(&mut self) -> ExitReport {
        self.stop_with(self.kill_signal).await
    }

    pub async fn stop_with(&mut self, sig: Signal) -> ExitReport {
        if let Err(e) = self.signal(sig) {
            tracing::warn!(target: "supervisor", "{e}");
        }
        self.wait().await
    }
}

impl std::fmt::Debug for ChildProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcessHandle")
            .field("command", &self.command)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}
