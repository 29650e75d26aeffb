//! Resolved, immutable configuration

use std::path::PathBuf;
use std::time::Duration;
use vault_env_core::Signal;
use vault_env_secrets::{ResolvedSecret, VaultConfig};
use vault_env_utils::tracing::{LogFormat, Verbosity};
use vault_env_utils::RetryConfig;

/// Everything needed to run, after templates and defaults have been applied
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only in dummy mode without an address
    pub vault: Option<VaultConfig>,
    /// In declaration order; later secrets win on name collisions
    pub secrets: Vec<ResolvedSecret>,
    pub cwd: PathBuf,
    pub kill_signal: Signal,
    pub dummy: bool,
    pub watch: bool,
    pub retry: RetryConfig,
    pub debounce: Duration,
    pub verbosity: Verbosity,
    pub log_format: LogFormat,
}

/// Overrides coming from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub verbosity: Option<Verbosity>,
    pub log_format: Option<LogFormat>,
    /// Forces watch mode on; the file decides otherwise
    pub watch: bool,
    /// Forces dummy mode on; the file decides otherwise
    pub dummy: bool,
}
