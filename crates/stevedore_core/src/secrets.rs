//! Secret Resolver: turns a layered environment into concrete values.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use stevedore_spec::{EnvValue, Region, RegionRegistry, ServiceManifest};
use stevedore_vault::{SecretLocation, SecretStore};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};

/// Default per-lookup timeout.
pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment for one service in one region, before secrets are fetched.
///
/// Layers, lowest precedence first: registry defaults, manifest, region.
pub fn layered_env(
    registry: &RegionRegistry,
    manifest: &ServiceManifest,
    region: &Region,
) -> BTreeMap<String, EnvValue> {
    let mut env = registry.defaults.env.clone();
    env.extend(manifest.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(region.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Environment with every value known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnv {
    /// Literal values.
    pub plain: BTreeMap<String, String>,
    /// Values fetched from the secret store.
    pub secrets: BTreeMap<String, String>,
}

impl ResolvedEnv {
    /// Every value, plain and secret.
    pub fn all(&self) -> impl Iterator<Item = (&String, &String)> {
        self.plain.iter().chain(self.secrets.iter())
    }
}

/// Fetches `ExternalSecret` values from a store, one bounded lookup each.
#[derive(Clone)]
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    timeout: Duration,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_SECRET_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an environment for `service` in `region`.
    ///
    /// Literals are copied through and never reach the store.
    pub async fn resolve(
        &self,
        service: &str,
        region: &Region,
        env: &BTreeMap<String, EnvValue>,
    ) -> ResolveResult<ResolvedEnv> {
        let mut resolved = ResolvedEnv::default();

        for (key, value) in env {
            match value {
                EnvValue::Literal(literal) => {
                    resolved.plain.insert(key.clone(), literal.clone());
                }
                EnvValue::ExternalSecret => {
                    let secret = self.lookup(service, region, key).await?;
                    resolved.secrets.insert(key.clone(), secret);
                }
            }
        }

        Ok(resolved)
    }

    async fn lookup(&self, service: &str, region: &Region, key: &str) -> ResolveResult<String> {
        let location = SecretLocation::new(&region.vault.url, &region.vault.folder, service, key);
        debug!("Looking up {} for region {}", location, region.name);

        let unavailable = |reason: String| ResolveError::SecretUnavailable {
            region: region.name.clone(),
            key: key.to_string(),
            reason,
        };

        match tokio::time::timeout(self.timeout, self.store.read(&location)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(unavailable(e.to_string())),
            Err(_) => Err(unavailable(format!(
                "lookup timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
