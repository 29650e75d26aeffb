//! Concurrent fetching and merging of resolved secrets

use crate::descriptor::{ResolvedSecret, SecretData};
use crate::store::{LeaseInfo, SecretResponse, SecretStore};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use vault_env_core::{EnvironmentVariables, Error, Result, ResultExt};

/// Data returned by the store for one secret, before formatting
#[derive(Debug, Clone, PartialEq)]
pub enum RawSecret {
    Single(SecretData),
    /// Children of a folder, in listing order
    Folder(Vec<(String, SecretData)>),
}

impl RawSecret {
    pub fn format(&self, secret: &ResolvedSecret) -> Result<EnvironmentVariables> {
        match self {
            RawSecret::Single(data) => secret.format(data),
            RawSecret::Folder(children) => secret.format_folder(children),
        }
    }
}

/// Variables produced by one secret together with its lease
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSecret {
    pub env: EnvironmentVariables,
    pub lease: Option<LeaseInfo>,
}

/// Fetches secrets from a store and merges them in declaration order.
///
/// No retries happen here; the first failed store call fails the whole
/// pass. In dummy mode the store is never called and every secret yields
/// an empty mapping.
pub struct Orchestrator {
    store: Arc<dyn SecretStore>,
    dummy: bool,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            dummy: false,
        }
    }

    /// Orchestrator that never talks to a store
    pub fn dummy() -> Self {
        Self {
            store: Arc::new(DisabledStore),
            dummy: true,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    /// Store calls only; store failures come back as [`Error::SecretFetch`]
    pub async fn fetch_raw(
        &self,
        secret: &ResolvedSecret,
    ) -> Result<(RawSecret, Option<LeaseInfo>)> {
        if self.dummy {
            return Ok((RawSecret::Single(SecretData::new()), None));
        }

        if !secret.is_folder() {
            let SecretResponse { data, lease } = self
                .store
                .read(secret.path())
                .await
                .for_secret(secret.path())?;
            return Ok((RawSecret::Single(data), lease));
        }

        let children = self
            .store
            .list(secret.path())
            .await
            .for_secret(secret.path())?;

        let reads = children
            .iter()
            .filter(|child| {
                let nested = child.ends_with('/');
                if nested {
                    tracing::debug!(
                        target: "orchestrator",
                        path = secret.path(),
                        child = child.as_str(),
                        "Skipping nested folder"
                    );
                }
                !nested
            })
            .map(|child| async move {
                let path = secret.child_path(child);
                let response = self
                    .store
                    .read(&path)
                    .await
                    .for_secret(&path)?;
                Ok::<_, Error>((child.clone(), response))
            });

        let responses = try_join_all(reads).await?;
        let lease = responses
            .iter()
            .fold(None, |acc, (_, response)| LeaseInfo::shortest(acc, response.lease));
        let children = responses
            .into_iter()
            .map(|(child, response)| (child, response.data))
            .collect();

        Ok((RawSecret::Folder(children), lease))
    }

    /// Fetch and format one secret
    pub async fn fetch(&self, secret: &ResolvedSecret) -> Result<FetchedSecret> {
        let (raw, lease) = self.fetch_raw(secret).await?;
        let env = raw.format(secret)?;
        Ok(FetchedSecret { env, lease })
    }

    /// Fetch every secret concurrently and merge left to right; later
    /// secrets win on name collisions
    pub async fn resolve_environment(
        &self,
        secrets: &[ResolvedSecret],
    ) -> Result<EnvironmentVariables> {
        if self.dummy {
            tracing::info!(target: "orchestrator", "Dummy mode, not fetching any secret");
            return Ok(EnvironmentVariables::new());
        }

        let fetched = try_join_all(secrets.iter().map(|secret| self.fetch(secret))).await?;
        let env = EnvironmentVariables::merge_all(fetched.into_iter().map(|f| f.env));

        tracing::debug!(
            target: "orchestrator",
            secrets = secrets.len(),
            variables = env.len(),
            "Resolved environment"
        );
        Ok(env)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("dummy", &self.dummy)
            .finish_non_exhaustive()
    }
}

/// Store behind [`Orchestrator::dummy`]; never reached
struct DisabledStore;

#[async_trait]
impl SecretStore for DisabledStore {
    async fn read(&self, path: &str) -> Result<SecretResponse> {
        Err(Error::store("GET", path, "secret store is disabled in dummy mode"))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        Err(Error::store("LIST", path, "secret store is disabled in dummy mode"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateEngine;
    use vault_env_core::SecretSpec;

    #[tokio::test]
    async fn test_dummy_mode_yields_empty_mapping() {
        let engine = TemplateEngine::default();
        let secrets = ResolvedSecret::resolve_all(
            &[
                SecretSpec::expanded("secret/a", "<%= key %>"),
                SecretSpec::folder("secret/b", "<%= folder %>_<%= key %>"),
            ],
            &engine,
        )
        .unwrap();

        let orchestrator = Orchestrator::dummy();
        assert!(orchestrator.is_dummy());
        let env = orchestrator.resolve_environment(&secrets).await.unwrap();
        assert!(env.is_empty());

        let fetched = orchestrator.fetch(&secrets[1]).await.unwrap();
        assert!(fetched.env.is_empty());
        assert_eq!(fetched.lease, None);
    }

    #[tokio::test]
    async fn test_disabled_store_errors() {
        let err = DisabledStore.read("secret/a").await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }
}
