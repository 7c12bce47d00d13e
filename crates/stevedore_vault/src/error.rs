//! Error types for the secret store module.

use thiserror::Error;

/// Result type alias for secret store operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while reading secrets.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret store unreachable: {0}")]
    Unreachable(String),

    #[error("Secret store denied access to {path}: HTTP {status}")]
    Denied { path: String, status: u16 },

    #[error("Unexpected secret store response: {0}")]
    InvalidResponse(String),

    #[error("No Vault token configured (set VAULT_TOKEN)")]
    MissingToken,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
