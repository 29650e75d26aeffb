//! Secret store abstraction
//!
//! The orchestrator and the watcher only ever see [`SecretStore`]; the
//! shipped implementation is [`VaultClient`].

mod vault;

pub use vault::{VaultClient, VaultConfig};

use crate::descriptor::SecretData;
use async_trait::async_trait;
use std::time::Duration;
use vault_env_core::Result;

/// Lease attached to a read by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseInfo {
    pub duration: Duration,
}

impl LeaseInfo {
    /// `None` for a zero lease, which means the secret never expires
    #[must_use]
    pub fn from_seconds(seconds: u64) -> Option<Self> {
        (seconds > 0).then(|| Self {
            duration: Duration::from_secs(seconds),
        })
    }

    /// Re-fetch at half the lease
    #[must_use]
    pub fn renew_after(&self) -> Duration {
        self.duration / 2
    }

    /// The shorter of two optional leases
    #[must_use]
    pub fn shortest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.duration <= b.duration { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Result of reading one secret
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretResponse {
    pub data: SecretData,
    pub lease: Option<LeaseInfo>,
}

/// Read access to a hierarchical secret store.
///
/// Failures are reported as [`vault_env_core::Error::Store`] carrying the
/// request method, URI and the store's message.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<SecretResponse>;

    /// Names of the children directly under `path`
    async fn list(&self, path: &str) -> Result<Vec<String>>;
}
