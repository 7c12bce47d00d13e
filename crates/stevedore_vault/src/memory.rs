//! In-memory secret store.
//!
//! Backs the `--secrets-file` mode of the CLI and doubles as a recording
//! store in tests: every lookup is captured so callers can verify exactly
//! which keys were requested.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{VaultError, VaultResult};
use crate::store::{SecretLocation, SecretStore};

/// Secret store holding values keyed by `{folder}/{service}/{key}`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    secrets: Arc<RwLock<BTreeMap<String, String>>>,
    lookups: Arc<RwLock<Vec<SecretLocation>>>,
    /// Simulated outage message.
    unreachable: Arc<RwLock<Option<String>>>,
    /// Artificial latency per lookup.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML mapping of `path: value`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> VaultResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let secrets: BTreeMap<String, String> = serde_yaml::from_str(&content)?;
        debug!("Loaded {} secrets from {:?}", secrets.len(), path.as_ref());
        Ok(Self {
            secrets: Arc::new(RwLock::new(secrets)),
            ..Self::default()
        })
    }

    /// Store a value at a path.
    pub fn with_secret(self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.write().insert(path.into(), value.into());
        self
    }

    /// Make every lookup fail as unreachable.
    pub fn simulate_outage(self, message: impl Into<String>) -> Self {
        *self.unreachable.write() = Some(message.into());
        self
    }

    /// Delay every lookup.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    /// All lookups made so far, in order.
    pub fn lookups(&self) -> Vec<SecretLocation> {
        self.lookups.read().clone()
    }

    /// Number of lookups made.
    pub fn lookup_count(&self) -> usize {
        self.lookups.read().len()
    }

    /// Whether a given variable was requested for any service/region.
    pub fn was_requested(&self, key: &str) -> bool {
        self.lookups.read().iter().any(|l| l.key == key)
    }

    /// Clear captured lookups.
    pub fn clear_lookups(&self) {
        self.lookups.write().clear();
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, location: &SecretLocation) -> VaultResult<String> {
        self.lookups.write().push(location.clone());

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.unreachable.read().clone() {
            return Err(VaultError::Unreachable(message));
        }

        self.secrets
            .read()
            .get(&location.path())
            .cloned()
            .ok_or_else(|| VaultError::NotFound(location.path()))
    }
}
