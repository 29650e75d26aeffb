//! Secret resolution for vault-env
//!
//! This crate turns declarative [`SecretSpec`](vault_env_core::SecretSpec)s
//! into environment variables:
//!
//! - [`template`] compiles the `<%= ... %>` templates used for paths and names
//! - [`descriptor`] resolves a spec once into a [`ResolvedSecret`]
//! - [`store`] talks to the secret store (Vault over HTTP)
//! - [`orchestrator`] fetches every secret concurrently and merges the result
//! - [`watcher`] keeps re-fetching on lease expiry and reports real changes

pub mod descriptor;
pub mod orchestrator;
pub mod store;
pub mod template;
pub mod watcher;

pub use descriptor::{ResolvedSecret, SecretData, SecretStrategy};
pub use orchestrator::{FetchedSecret, Orchestrator, RawSecret};
pub use store::{LeaseInfo, SecretResponse, SecretStore, VaultClient, VaultConfig};
pub use template::{EnvLookup, ProcessEnv, Template, TemplateContext, TemplateEngine};
pub use watcher::{SecretWatcher, WatchConfig, WatchEvent};
