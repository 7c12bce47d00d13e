//! Secret store trait and lookup keys.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VaultResult;

/// Where a single secret lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretLocation {
    /// Base URL of the store for the region.
    pub url: String,
    /// Region folder inside the store.
    pub folder: String,
    pub service: String,
    /// Environment variable name.
    pub key: String,
}

impl SecretLocation {
    pub fn new(
        url: impl Into<String>,
        folder: impl Into<String>,
        service: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            folder: folder.into(),
            service: service.into(),
            key: key.into(),
        }
    }

    /// Path inside the store: `{folder}/{service}/{key}`.
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.folder.trim_matches('/'),
            self.service,
            self.key
        )
    }
}

impl fmt::Display for SecretLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Key/value secret lookup.
///
/// Implementations do not retry; callers decide what a failure means.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Read the value stored at `location`.
    async fn read(&self, location: &SecretLocation) -> VaultResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_path() {
        let location = SecretLocation::new("http://localhost:8200", "/minikube/", "webapp", "DATABASE_URL");
        assert_eq!(location.path(), "minikube/webapp/DATABASE_URL");
        assert_eq!(location.to_string(), "minikube/webapp/DATABASE_URL");
    }
}
