//! Configuration loader for vault-env
//!
//! Loading happens in two steps so logging can be set up before anything
//! interesting is logged: [`ConfigLoader::read`] parses the file, then
//! [`ConfigLoader::resolve`] renders templates, applies defaults and
//! validates.

use crate::config::{Config, RuntimeOptions};
use crate::file::ConfigFile;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use vault_env_core::{
    Error, Result, ResultExt, SecretSpec, Signal, DEFAULT_DEBOUNCE, DEFAULT_KILL_SIGNAL,
    DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL, VAULT_ADDR_VAR, VAULT_TOKEN_VAR,
};
use vault_env_secrets::{EnvLookup, ProcessEnv, ResolvedSecret, TemplateEngine, VaultConfig};
use vault_env_utils::tracing::{LogFormat, Verbosity};
use vault_env_utils::RetryConfig;

/// The `vault` section after its strings have been rendered
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultSection {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    auth: Option<AuthSection>,
    /// Request timeout in milliseconds
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: Value,
}

/// Configuration loader that handles all startup configuration
pub struct ConfigLoader {
    file: Option<PathBuf>,
    runtime: RuntimeOptions,
    env: Arc<dyn EnvLookup>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            runtime: RuntimeOptions::default(),
            env: Arc::new(ProcessEnv),
        }
    }

    /// Set the configuration file to read
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set runtime options
    pub fn runtime(mut self, runtime: RuntimeOptions) -> Self {
        self.runtime = runtime;
        self
    }

    /// Environment used by `env(...)` in templates and for the
    /// `VAULT_ADDR` / `VAULT_TOKEN` fallbacks
    pub fn env_lookup(mut self, env: Arc<dyn EnvLookup>) -> Self {
        self.env = env;
        self
    }

    /// Verbosity and log format, command line first
    pub fn logging(&self, file: &ConfigFile) -> (Verbosity, LogFormat) {
        (
            self.runtime
                .verbosity
                .or(file.verbosity)
                .unwrap_or_default(),
            self.runtime
                .log_format
                .or(file.log_format)
                .unwrap_or_default(),
        )
    }

    /// Read the configuration file
    pub fn read(&self) -> Result<ConfigFile> {
        let path = self
            .file
            .as_deref()
            .ok_or_else(|| Error::configuration("no configuration file given"))?;
        ConfigFile::from_path(path)
    }

    /// Load the configuration
    pub fn load(self) -> Result<Config> {
        let file = self.read()?;
        self.resolve(file)
    }

    /// Render templates, apply defaults and validate
    pub fn resolve(&self, file: ConfigFile) -> Result<Config> {
        let (verbosity, log_format) = self.logging(&file);
        let dummy = self.runtime.dummy || file.dummy;
        let watch = self.runtime.watch || file.watch;

        validate_secrets(&file.secrets)?;

        let engine = TemplateEngine::new(Arc::clone(&self.env));
        let vault = self.resolve_vault(file.vault.as_ref(), &engine, dummy)?;
        let secrets = ResolvedSecret::resolve_all(&file.secrets, &engine)?;

        let cwd = match file.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()
                .map_err(|e| Error::file_system(".", "resolve current directory", e))?,
        };

        let kill_signal = match file.kill_signal {
            Some(signal) => signal,
            None => DEFAULT_KILL_SIGNAL.parse::<Signal>()?,
        };

        let retry = RetryConfig::new(
            file.retry
                .interval
                .map_or(DEFAULT_RETRY_INTERVAL, Duration::from_millis),
            file.retry
                .max_attempts
                .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
        );

        let debounce = file.debounce.map_or(DEFAULT_DEBOUNCE, Duration::from_millis);

        tracing::debug!(
            target: "config",
            secrets = secrets.len(),
            dummy,
            watch,
            kill_signal = kill_signal.name(),
            "Configuration resolved"
        );

        Ok(Config {
            vault,
            secrets,
            cwd,
            kill_signal,
            dummy,
            watch,
            retry,
            debounce,
            verbosity,
            log_format,
        })
    }

    fn resolve_vault(
        &self,
        raw: Option<&Value>,
        engine: &TemplateEngine,
        dummy: bool,
    ) -> Result<Option<VaultConfig>> {
        let section: VaultSection = match raw {
            Some(value) => serde_json::from_value(render_value(value, engine)?)
                .context("invalid vault section")?,
            None => VaultSection::default(),
        };

        let address = section.address.or_else(|| self.env.var(VAULT_ADDR_VAR));
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            if dummy {
                return Ok(None);
            }
            return Err(Error::configuration(format!(
                "vault address is required; set vault.address or {VAULT_ADDR_VAR}"
            )));
        };

        let address = Url::parse(&address).map_err(|e| {
            Error::configuration(format!("invalid vault address '{address}': {e}"))
        })?;

        let token = match (section.token, section.auth) {
            (Some(token), _) => Some(token),
            (None, Some(auth)) => Some(token_from_auth(auth)?),
            (None, None) => self.env.var(VAULT_TOKEN_VAR),
        };

        let mut config = VaultConfig::new(address);
        config.token = token;
        if let Some(timeout) = section.timeout {
            config.timeout = Duration::from_millis(timeout);
        }
        Ok(Some(config))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn token_from_auth(auth: AuthSection) -> Result<String> {
    if auth.kind != "token" {
        return Err(Error::configuration(format!(
            "unsupported vault auth type '{}', only 'token' is supported",
            auth.kind
        )));
    }

    auth.config
        .get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::configuration("vault auth of type 'token' needs config.token"))
}

fn validate_secrets(secrets: &[SecretSpec]) -> Result<()> {
    for (index, secret) in secrets.iter().enumerate() {
        if secret.path.trim().is_empty() {
            return Err(Error::configuration(format!(
                "secret #{index} has an empty path"
            )));
        }
        if secret.key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(Error::configuration(format!(
                "secret #{index} ({}) has an empty key",
                secret.path
            )));
        }
    }
    Ok(())
}

/// Render every string inside `value`
fn render_value(value: &Value, engine: &TemplateEngine) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(engine.render_str(s)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, engine))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_value(v, engine)?)))
                .collect::<Result<serde_json::Map<_, _>>>()?,
        ),
        other => other.clone(),
    })
}
