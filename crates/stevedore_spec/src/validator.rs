//! Manifest and registry validation.

use std::collections::HashSet;
use std::fmt;

use crate::error::{SpecError, SpecResult};
use crate::models::ServiceManifest;
use crate::registry::RegionRegistry;

/// A validation failure tied to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn the first error into a `SpecError::Validation`.
    pub fn into_result(self) -> SpecResult<Self> {
        match self.errors.first() {
            Some(issue) => Err(SpecError::validation(&issue.field, &issue.message)),
            None => Ok(self),
        }
    }
}

/// Validator for manifests and registries.
pub struct SpecValidator;

impl SpecValidator {
    /// Validate the shape of a single manifest.
    pub fn validate_manifest(manifest: &ServiceManifest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if manifest.name.trim().is_empty() {
            result.add_error("name", "name cannot be empty");
        }

        if manifest.metadata.team.trim().is_empty() {
            result.add_error("metadata.team", "team cannot be empty");
        }

        if manifest.regions.is_empty() {
            result.add_error("regions", "at least one region must be declared");
        }
        let mut seen = HashSet::new();
        for (i, region) in manifest.regions.iter().enumerate() {
            if region.trim().is_empty() {
                result.add_error(format!("regions[{}]", i), "region name cannot be empty");
            } else if !seen.insert(region.as_str()) {
                result.add_error(format!("regions[{}]", i), format!("duplicate region '{}'", region));
            }
        }

        if manifest.replica_count == Some(0) {
            result.add_error("replicaCount", "replicaCount must be at least 1");
        }

        if let Some(port) = manifest.http_port {
            if port == 0 || port > 65535 {
                result.add_error("httpPort", format!("port {} is out of range", port));
            }
        }

        if let Some(health) = &manifest.health {
            if !health.uri.starts_with('/') {
                result.add_error("health.uri", "health uri must start with '/'");
            }
            if manifest.http_port.is_none() {
                result.add_error("httpPort", "a health check requires httpPort");
            }
        }

        if let Err(SpecError::Validation { field, message }) = manifest.resources.verify() {
            result.add_error(field, message);
        }

        if let Some(configs) = &manifest.configs {
            if !configs.mount.starts_with('/') {
                result.add_error("configs.mount", "mount must be an absolute path");
            }
            let mut dests = HashSet::new();
            for (i, file) in configs.files.iter().enumerate() {
                if file.name.trim().is_empty() {
                    result.add_error(format!("configs.files[{}].name", i), "template name cannot be empty");
                }
                if file.dest.trim().is_empty() || file.dest.contains('/') {
                    result.add_error(
                        format!("configs.files[{}].dest", i),
                        "destination must be a plain file name",
                    );
                } else if !dests.insert(file.dest.as_str()) {
                    result.add_error(
                        format!("configs.files[{}].dest", i),
                        format!("duplicate destination '{}'", file.dest),
                    );
                }
            }
        }

        for key in manifest.env.keys() {
            if key.is_empty() || key.contains('=') {
                result.add_error(format!("env.{}", key), "invalid environment variable name");
            }
        }

        if manifest.version.is_none() {
            result.add_warning(format!(
                "{} has no version; every region must pin one",
                manifest.name
            ));
        }

        result
    }

    /// Validate the shape of a registry. Cross references are left to
    /// [`SpecValidator::validate_registry_references`].
    pub fn validate_registry(registry: &RegionRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (key, cluster) in &registry.clusters {
            if cluster.name != *key {
                result.add_error(
                    format!("clusters.{}.name", key),
                    format!("cluster name '{}' does not match its key", cluster.name),
                );
            }
            if cluster.api.trim().is_empty() {
                result.add_error(format!("clusters.{}.api", key), "api endpoint cannot be empty");
            }
        }

        let mut seen = HashSet::new();
        for (i, region) in registry.regions.iter().enumerate() {
            let at = |field: &str| format!("regions[{}].{}", i, field);
            if region.name.trim().is_empty() {
                result.add_error(at("name"), "region name cannot be empty");
            } else if !seen.insert(region.name.as_str()) {
                result.add_error(at("name"), format!("duplicate region '{}'", region.name));
            }
            if region.namespace.trim().is_empty() {
                result.add_error(at("namespace"), "namespace cannot be empty");
            }
            if region.vault.url.trim().is_empty() {
                result.add_error(at("vault.url"), "vault url cannot be empty");
            }
            if region.vault.folder.trim().is_empty() {
                result.add_error(at("vault.folder"), "vault folder cannot be empty");
            }
        }

        let mut teams = HashSet::new();
        for (i, team) in registry.teams.iter().enumerate() {
            if !teams.insert(team.name.as_str()) {
                result.add_error(format!("teams[{}].name", i), format!("duplicate team '{}'", team.name));
            }
        }

        result
    }

    /// Check that every region points at a declared cluster.
    pub fn validate_registry_references(registry: &RegionRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (i, region) in registry.regions.iter().enumerate() {
            match registry.cluster(&region.cluster) {
                None => result.add_error(
                    format!("regions[{}].cluster", i),
                    format!("region '{}' references unknown cluster '{}'", region.name, region.cluster),
                ),
                Some(cluster) if !cluster.regions.contains(&region.name) => {
                    result.add_warning(format!(
                        "cluster '{}' does not list region '{}' as a member",
                        cluster.name, region.name
                    ));
                }
                Some(_) => {}
            }
        }

        result
    }

    /// Validate a manifest against the registry it will be resolved with.
    pub fn validate_against_registry(
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if registry.team(&manifest.metadata.team).is_none() {
            result.add_error(
                "metadata.team",
                format!("team '{}' is not declared in the registry", manifest.metadata.team),
            );
        }

        if registry
            .image_for(&manifest.name, manifest.image.as_deref())
            .is_none()
        {
            result.add_error("image", "no image given and the registry has no imagePrefix");
        }

        for (i, name) in manifest.regions.iter().enumerate() {
            let Some(region) = registry.region(name) else {
                result.add_error(
                    format!("regions[{}]", i),
                    format!("region '{}' is not declared in the registry", name),
                );
                continue;
            };

            let version = region
                .pinned_version(&manifest.name)
                .or(manifest.version.as_deref());
            match version {
                None => result.add_error(
                    "version",
                    format!("no version for {} in region {}", manifest.name, region.name),
                ),
                Some(v) if !region.versioning_scheme.accepts(v) => result.add_error(
                    "version",
                    format!(
                        "version '{}' does not satisfy the {:?} scheme of region {}",
                        v, region.versioning_scheme, region.name
                    ),
                ),
                Some(_) => {}
            }

            if region.environment == "prod" {
                if manifest.health.as_ref().map_or(true, |h| h.wait == 0) {
                    result.add_warning(format!(
                        "{} has no health check wait in production region {}",
                        manifest.name, region.name
                    ));
                }
                if manifest
                    .replica_count
                    .or(registry.defaults.replica_count)
                    .unwrap_or(1)
                    < 2
                {
                    result.add_warning(format!(
                        "{} runs a single replica in production region {}",
                        manifest.name, region.name
                    ));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, ResourceRequest, ResourceRequirements};
    use std::collections::BTreeMap;

    fn manifest() -> ServiceManifest {
        ServiceManifest {
            name: "webapp".to_string(),
            image: Some("clux/webapp-rs".to_string()),
            version: Some("0.2.0".to_string()),
            metadata: Metadata {
                team: "devops".to_string(),
                repo: None,
                contacts: vec![],
            },
            resources: ResourceRequirements {
                requests: ResourceRequest::new("200m", "300Mi"),
                limits: ResourceRequest::new("500m", "500Mi"),
            },
            replica_count: Some(1),
            health: None,
            http_port: Some(8000),
            configs: None,
            regions: vec!["minikube".to_string()],
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_manifest() {
        let result = SpecValidator::validate_manifest(&manifest());
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_validate_empty_regions() {
        let mut mf = manifest();
        mf.regions.clear();
        let result = SpecValidator::validate_manifest(&mf);
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "regions");
    }

    #[test]
    fn test_duplicate_region() {
        let mut mf = manifest();
        mf.regions.push("minikube".to_string());
        let result = SpecValidator::validate_manifest(&mf);
        assert!(!result.valid);
        assert_eq!(result.errors[0].field, "regions[1]");
    }

    #[test]
    fn test_into_result_names_field() {
        let mut mf = manifest();
        mf.replica_count = Some(0);
        let err = SpecValidator::validate_manifest(&mf).into_result().unwrap_err();
        match err {
            SpecError::Validation { field, .. } => assert_eq!(field, "replicaCount"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_team_and_region() {
        let registry = RegionRegistry::default();
        let result = SpecValidator::validate_against_registry(&manifest(), &registry);
        assert!(!result.valid);
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"metadata.team"));
        assert!(fields.contains(&"regions[0]"));
    }
}
