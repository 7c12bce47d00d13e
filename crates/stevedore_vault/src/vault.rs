//! HTTP client for a Vault KV (v1) secret engine.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::store::{SecretLocation, SecretStore};

/// Reads `{url}/v1/{mount}/{folder}/{service}/{key}` and returns `data.value`.
pub struct VaultClient {
    http: Client,
    token: String,
    mount: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    data: SecretData,
}

#[derive(Deserialize)]
struct SecretData {
    value: String,
}

impl VaultClient {
    /// Create a client. A token is required.
    pub fn new(config: &VaultConfig) -> VaultResult<Self> {
        let token = config.token.clone().ok_or(VaultError::MissingToken)?;
        let http = Client::builder()
            .timeout(config.timeout_duration())
            .build()?;

        Ok(Self {
            http,
            token,
            mount: config.mount.trim_matches('/').to_string(),
        })
    }

    /// Full URL for a secret.
    pub fn secret_url(&self, location: &SecretLocation) -> String {
        format!(
            "{}/v1/{}/{}",
            location.url.trim_end_matches('/'),
            self.mount,
            location.path()
        )
    }
}

/// Extract the secret value from a KV read response body.
pub fn parse_secret_response(body: &str) -> VaultResult<String> {
    let response: SecretResponse = serde_json::from_str(body)
        .map_err(|e| VaultError::InvalidResponse(format!("expected data.value: {}", e)))?;
    Ok(response.data.value)
}

#[async_trait]
impl SecretStore for VaultClient {
    fn name(&self) -> &str {
        "vault"
    }

    async fn read(&self, location: &SecretLocation) -> VaultResult<String> {
        let url = self.secret_url(location);
        debug!("Reading secret {}", location);

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| VaultError::Unreachable(format!("{}: {}", location.url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::NotFound(location.path()));
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(VaultError::Denied {
                path: location.path(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(VaultError::Unreachable(format!(
                "{} returned HTTP {}",
                location.url, status
            )));
        }

        let body = response.text().await?;
        parse_secret_response(&body)
    }
}
