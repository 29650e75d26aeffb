//! Vault HTTP API client (KV version 1 layout)

use super::{LeaseInfo, SecretResponse, SecretStore};
use crate::descriptor::SecretData;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;
use vault_env_core::{Error, Result, REDACTED_VALUE, VAULT_API_PREFIX, VAULT_TOKEN_HEADER};

/// Connection settings for [`VaultClient`]
#[derive(Clone)]
pub struct VaultConfig {
    pub address: Url,
    pub token: Option<String>,
    /// Per-request timeout of the HTTP client
    pub timeout: Duration,
}

impl VaultConfig {
    pub fn new(address: Url) -> Self {
        Self {
            address,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("address", &self.address.as_str())
            .field("token", &self.token.as_ref().map(|_| REDACTED_VALUE))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    lease_duration: u64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: ListData,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Body of a successful response, with the URI for error reporting
struct ResponseBody {
    uri: String,
    text: String,
}

pub struct VaultClient {
    config: VaultConfig,
    client: reqwest::Client,
}

impl VaultClient {
    pub fn new(config: VaultConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn address(&self) -> &Url {
        &self.config.address
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}",
            self.config.address.as_str().trim_end_matches('/'),
            VAULT_API_PREFIX,
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| Error::store("GET", raw, format!("invalid URL: {e}")))
    }

    /// Send a GET and return the body of a successful response
    async fn get(&self, method: &str, url: Url) -> Result<ResponseBody> {
        let uri = url.to_string();
        tracing::debug!(target: "vault_client", method, uri = %uri, "Sending request");

        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.header(VAULT_TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::store(method, &uri, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::store(method, &uri, e.to_string()))?;

        if !status.is_success() {
            let errors = serde_json::from_str::<ErrorResponse>(&body).unwrap_or_default();
            let message = if errors.errors.is_empty() {
                format!("status {status}")
            } else {
                format!("status {status}: {}", errors.errors.join(", "))
            };
            return Err(Error::store(method, &uri, message));
        }

        Ok(ResponseBody { uri, text: body })
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read(&self, path: &str) -> Result<SecretResponse> {
        let url = self.endpoint(path)?;
        let body = self.get("GET", url).await?;

        let parsed: ReadResponse = serde_json::from_str(&body.text)
            .map_err(|e| Error::store("GET", &body.uri, format!("malformed response: {e}")))?;

        let data = match parsed.data {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => SecretData::new(),
            Some(other) => {
                return Err(Error::store(
                    "GET",
                    &body.uri,
                    format!("expected an object in 'data', got {other}"),
                ))
            }
        };

        Ok(SecretResponse {
            data,
            lease: LeaseInfo::from_seconds(parsed.lease_duration),
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("list", "true");
        let body = self.get("LIST", url).await?;

        let parsed: ListResponse = serde_json::from_str(&body.text)
            .map_err(|e| Error::store("LIST", &body.uri, format!("malformed response: {e}")))?;

        Ok(parsed.data.keys)
    }
}
