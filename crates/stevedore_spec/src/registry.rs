//! Cluster, region and team registry.
//!
//! The registry is read once and then shared by reference; nothing in the
//! resolver mutates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Contact, EnvValue};

/// A named Kubernetes API endpoint grouping one or more regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub api: String,
    #[serde(default)]
    pub regions: Vec<String>,
}

/// How the orchestrator reconciles desired and actual state in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReconciliationMode {
    #[default]
    CrdOwned,
    CrdVersioned,
    CrdBorrowed,
}

/// Which version strings a region accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VersioningScheme {
    #[default]
    Semver,
    GitShaOrSemver,
}

impl VersioningScheme {
    pub fn accepts(&self, version: &str) -> bool {
        let is_semver = semver::Version::parse(version).is_ok();
        match self {
            VersioningScheme::Semver => is_semver,
            VersioningScheme::GitShaOrSemver => is_semver || is_git_sha(version),
        }
    }
}

fn is_git_sha(version: &str) -> bool {
    version.len() == 40 && version.chars().all(|c| c.is_ascii_hexdigit())
}

/// Secret store location for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSettings {
    pub url: String,
    pub folder: String,
}

/// A named deployment target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub name: String,
    pub environment: String,
    pub cluster: String,
    pub namespace: String,
    #[serde(default)]
    pub reconciliation_mode: ReconciliationMode,
    #[serde(default)]
    pub versioning_scheme: VersioningScheme,
    pub vault: VaultSettings,
    /// Region-specific environment; wins over manifest values.
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
    /// Version pins per service.
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

impl Region {
    pub fn pinned_version(&self, service: &str) -> Option<&str> {
        self.versions.get(service).map(String::as_str)
    }
}

/// Team ownership record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub owners: Vec<Contact>,
    /// GitHub team (within the registry organisation) administering the
    /// team's services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_admins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// GitHub organisation owning the service repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubSettings {
    pub organisation: String,
}

/// Values applied to every service unless the manifest or region says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

/// The cluster/region/team registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionRegistry {
    #[serde(default)]
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub defaults: RegistryDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSettings>,
}

impl RegionRegistry {
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.get(name)
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name == name)
    }

    /// Region names in declaration order.
    pub fn region_names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    /// Image for a service: explicit image, else `{imagePrefix}/{service}`.
    pub fn image_for(&self, service: &str, image: Option<&str>) -> Option<String> {
        match (image, &self.defaults.image_prefix) {
            (Some(image), _) => Some(image.to_string()),
            (None, Some(prefix)) => Some(format!("{}/{}", prefix.trim_end_matches('/'), service)),
            (None, None) => None,
        }
    }

    /// Namespace for a team in a region.
    ///
    /// A team namespace wins when the team exists and declares one; otherwise
    /// the region namespace is used.
    pub fn namespace_for(&self, region: &Region, team: &str) -> String {
        self.team(team)
            .and_then(|t| t.namespace.clone())
            .unwrap_or_else(|| region.namespace.clone())
    }
}
