//! Schema loading for manifests and registries.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SpecError, SpecResult};
use crate::models::ServiceManifest;
use crate::registry::RegionRegistry;
use crate::validator::SpecValidator;

/// File name of a service manifest inside `services/<name>/`.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// Parses and validates input documents.
pub struct SchemaLoader;

impl SchemaLoader {
    /// Parse and validate a service manifest.
    pub fn parse_manifest(content: &str) -> SpecResult<ServiceManifest> {
        let manifest: ServiceManifest =
            serde_yaml::from_str(content).map_err(SpecError::from_yaml)?;
        SpecValidator::validate_manifest(&manifest).into_result()?;
        Ok(manifest)
    }

    /// Parse and validate a region registry.
    pub fn parse_registry(content: &str) -> SpecResult<RegionRegistry> {
        let registry: RegionRegistry =
            serde_yaml::from_str(content).map_err(SpecError::from_yaml)?;
        SpecValidator::validate_registry(&registry).into_result()?;
        Ok(registry)
    }

    /// Read a manifest file.
    pub fn load_manifest(path: impl AsRef<Path>) -> SpecResult<ServiceManifest> {
        let content = Self::read(path.as_ref())?;
        Self::parse_manifest(&content)
    }

    /// Read a registry file.
    pub fn load_registry(path: impl AsRef<Path>) -> SpecResult<RegionRegistry> {
        let content = Self::read(path.as_ref())?;
        Self::parse_registry(&content)
    }

    /// Load every `services/*/manifest.yml` under `root`, sorted by path.
    ///
    /// A manifest that fails to load aborts discovery.
    pub fn discover_manifests(root: impl AsRef<Path>) -> SpecResult<Vec<(PathBuf, ServiceManifest)>> {
        let services_dir = root.as_ref().join("services");
        let mut manifests = Vec::new();

        if !services_dir.exists() {
            warn!("Services directory does not exist: {:?}", services_dir);
            return Ok(manifests);
        }

        for entry in WalkDir::new(&services_dir)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.file_name().map_or(false, |n| n == MANIFEST_FILE) {
                let manifest = Self::load_manifest(path)?;
                manifests.push((path.to_path_buf(), manifest));
            }
        }

        Ok(manifests)
    }

    fn read(path: &Path) -> SpecResult<String> {
        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }
        debug!("Reading {:?}", path);
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnvValue;

    const WEBAPP: &str = r#"
name: webapp
image: clux/webapp-rs
version: 0.2.0
metadata:
  team: devops
resources:
  requests:
    cpu: 200m
    memory: 300Mi
  limits:
    cpu: 500m
    memory: 500Mi
replicaCount: 1
health:
  uri: /health
  wait: 0
httpPort: 8000
regions:
- minikube
env:
  DATABASE_URL: IN_VAULT
  RUST_LOG: info
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = SchemaLoader::parse_manifest(WEBAPP).unwrap();
        assert_eq!(manifest.name, "webapp");
        assert_eq!(manifest.http_port, Some(8000));
        assert_eq!(manifest.env["DATABASE_URL"], EnvValue::ExternalSecret);
        assert_eq!(manifest.secret_keys(), vec!["DATABASE_URL"]);
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = SchemaLoader::parse_manifest("name: webapp\n").unwrap_err();
        match err {
            SpecError::Validation { field, .. } => assert_eq!(field, "metadata"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_float_version_names_field() {
        let content = WEBAPP.replace("version: 0.2.0", "version: 1.10");
        match SchemaLoader::parse_manifest(&content).unwrap_err() {
            SpecError::Validation { field, message } => {
                assert_eq!(field, "version");
                assert!(message.contains("1.1"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = format!("{}colour: blue\n", WEBAPP);
        assert!(matches!(
            SchemaLoader::parse_manifest(&content),
            Err(SpecError::Validation { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SchemaLoader::load_manifest("/nonexistent/manifest.yml").unwrap_err();
        assert!(matches!(err, SpecError::NotFound(_)));
    }
}
