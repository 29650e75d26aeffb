//! Constants used throughout the vault-env codebase
use std::time::Duration;

// Environment variable names
pub const VAULT_ADDR_VAR: &str = "VAULT_ADDR";
pub const VAULT_TOKEN_VAR: &str = "VAULT_TOKEN";
pub const VAULT_ENV_LOG_VAR: &str = "VAULT_ENV_LOG";

// Vault HTTP API
pub const VAULT_API_PREFIX: &str = "v1";
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

// Watch mode defaults
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

// Process supervision
pub const DEFAULT_KILL_SIGNAL: &str = "SIGTERM";

/// Exit code reported to our own caller when the child died from a signal
pub const SIGNALED_EXIT_CODE: i32 = 1;

/// Synthesized exit codes for children that never started
pub const EXIT_CODE_NOT_FOUND: i32 = 127;
pub const EXIT_CODE_NOT_EXECUTABLE: i32 = 126;
pub const EXIT_CODE_SPAWN_FAILED: i32 = 1;

// Redaction
pub const REDACTED_VALUE: &str = "********";

/// Signals relayed from the parent process to the supervised child
pub const FORWARDED_SIGNALS: &[&str] = &["SIGHUP", "SIGTERM", "SIGINT", "SIGQUIT", "SIGUSR1", "SIGUSR2"];
