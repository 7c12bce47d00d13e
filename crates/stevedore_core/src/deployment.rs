//! The resolved, per-region deployment object.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stevedore_spec::{HealthCheck, ReconciliationMode, ResourceRequirements};

/// Value shown in place of secrets when a deployment is printed for humans.
pub const REDACTED: &str = "<redacted>";

/// One service in one region, with every value known.
///
/// Built fresh for each run and never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDeployment {
    pub service: String,
    pub region: String,
    pub environment: String,
    pub cluster: String,
    pub api_server: String,
    pub namespace: String,
    pub reconciliation_mode: ReconciliationMode,
    /// Secret store folder the secrets were read from.
    pub vault_folder: String,
    pub team: String,
    pub image: String,
    pub version: String,
    pub replica_count: u32,
    pub resources: ResourceRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_mount: Option<String>,
    /// Rendered config files keyed by destination file name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_files: BTreeMap<String, String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
}

impl ResolvedDeployment {
    /// Full image reference, `{image}:{version}`.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }

    /// Name of the ConfigMap carrying rendered files.
    pub fn config_map_name(&self) -> String {
        format!("{}-config", self.service)
    }

    /// Name of the Secret carrying resolved secrets.
    pub fn secret_name(&self) -> String {
        format!("{}-secrets", self.service)
    }

    /// Copy with every secret value masked, including occurrences inside
    /// rendered config files.
    pub fn redacted(&self) -> Self {
        let mut values: Vec<&str> = self
            .secrets
            .values()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        // longest first so a value containing another is masked whole
        values.sort_by_key(|v| Reverse(v.len()));

        let mut copy = self.clone();
        for value in copy.secrets.values_mut() {
            *value = REDACTED.to_string();
        }
        for content in copy.config_files.values_mut() {
            for secret in &values {
                if content.contains(secret) {
                    *content = content.replace(secret, REDACTED);
                }
            }
        }
        copy
    }
}
