//! The configuration file as written by the user

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use vault_env_core::{Error, Result, SecretSpec, Signal};
use vault_env_utils::tracing::{LogFormat, Verbosity};

/// Raw contents of the JSON configuration file.
///
/// The `vault` section stays untyped until its strings have been rendered
/// through the template engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<Value>,
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_signal: Option<Signal>,
    #[serde(default)]
    pub dummy: bool,
    #[serde(default)]
    pub watch: bool,
    #[serde(default)]
    pub retry: RetryFile,
    /// Debounce window in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryFile {
    /// Delay between attempts in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl ConfigFile {
    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| Error::configuration(format!("invalid configuration: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read", e))?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::configuration(format!(
                "invalid configuration file '{}': {e}",
                path.display()
            ))
        })
    }
}
