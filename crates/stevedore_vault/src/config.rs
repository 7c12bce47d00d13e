//! Secret store client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the Vault token.
pub const VAULT_TOKEN_ENV: &str = "VAULT_TOKEN";

/// Vault client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Token sent as `X-Vault-Token`
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Mount of the KV engine (default: secret)
    pub mount: String,
    /// Per request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            token: None,
            mount: "secret".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl VaultConfig {
    /// Default config with the token taken from `VAULT_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            token: std::env::var(VAULT_TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
