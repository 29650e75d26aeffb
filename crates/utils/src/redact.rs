//! Masking of secret values before they reach the log

use vault_env_core::{EnvironmentVariables, REDACTED_VALUE};

/// Copy of `env` with every value replaced by a fixed-width mask.
///
/// The mask never depends on the value, so not even the length leaks.
#[must_use]
pub fn redact_environment(env: &EnvironmentVariables) -> EnvironmentVariables {
    env.keys()
        .map(|key| (key.clone(), REDACTED_VALUE.to_string()))
        .collect()
}

/// Pretty, redacted rendering of `env` for debug logging
#[must_use]
pub fn describe_environment(env: &EnvironmentVariables) -> String {
    redact_environment(env)
        .iter()
        .map(|(key, value)| format!("\t{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
