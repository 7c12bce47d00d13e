//! Region Selector: maps declared region names onto registry entries.

use stevedore_spec::{Cluster, Region, RegionRegistry, ServiceManifest};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};

/// A region paired with the cluster it runs on.
#[derive(Debug, Clone, Copy)]
pub struct RegionTarget<'a> {
    pub region: &'a Region,
    pub cluster: &'a Cluster,
}

impl<'a> RegionTarget<'a> {
    pub fn name(&self) -> &'a str {
        &self.region.name
    }
}

/// Looks up regions and their clusters in the registry.
pub struct RegionSelector;

impl RegionSelector {
    /// Resolve a single region name.
    pub fn target<'a>(registry: &'a RegionRegistry, name: &str) -> ResolveResult<RegionTarget<'a>> {
        let region = registry
            .region(name)
            .ok_or_else(|| ResolveError::UnknownRegion(name.to_string()))?;
        let cluster = registry
            .cluster(&region.cluster)
            .ok_or_else(|| ResolveError::UnknownCluster {
                region: region.name.clone(),
                cluster: region.cluster.clone(),
            })?;
        Ok(RegionTarget { region, cluster })
    }

    /// Every region the manifest declares, in manifest order.
    pub fn select<'a>(
        manifest: &ServiceManifest,
        registry: &'a RegionRegistry,
    ) -> ResolveResult<Vec<RegionTarget<'a>>> {
        let targets = manifest
            .regions
            .iter()
            .map(|name| Self::target(registry, name))
            .collect::<ResolveResult<Vec<_>>>()?;
        debug!("Selected {} regions for {}", targets.len(), manifest.name);
        Ok(targets)
    }

    /// A subset of the declared regions, still in manifest order.
    ///
    /// Every requested name must be declared by the manifest.
    pub fn select_only<'a>(
        manifest: &ServiceManifest,
        registry: &'a RegionRegistry,
        only: &[String],
    ) -> ResolveResult<Vec<RegionTarget<'a>>> {
        if only.is_empty() {
            return Self::select(manifest, registry);
        }
        if let Some(missing) = only.iter().find(|name| !manifest.deploys_to(name)) {
            return Err(ResolveError::UnknownRegion(missing.clone()));
        }
        let targets = Self::select(manifest, registry)?;
        Ok(targets
            .into_iter()
            .filter(|t| only.iter().any(|name| name == t.name()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_spec::SchemaLoader;

    const REGISTRY: &str = r#"
clusters:
  kind:
    name: kind
    api: https://127.0.0.1:6443
    regions: [dev-a, dev-b]
regions:
  - name: dev-a
    environment: dev
    cluster: kind
    namespace: apps
    vault: { url: "http://vault", folder: dev-a }
  - name: dev-b
    environment: dev
    cluster: kind
    namespace: apps
    vault: { url: "http://vault", folder: dev-b }
  - name: orphan
    environment: dev
    cluster: gone
    namespace: apps
    vault: { url: "http://vault", folder: orphan }
"#;

    fn manifest(regions: &[&str]) -> ServiceManifest {
        let mut manifest = SchemaLoader::parse_manifest(
            r#"
name: api
version: 1.0.0
metadata: { team: core }
resources:
  requests: { cpu: 100m, memory: 64Mi }
  limits: { cpu: 200m, memory: 128Mi }
regions: [dev-a]
"#,
        )
        .unwrap();
        manifest.regions = regions.iter().map(|r| r.to_string()).collect();
        manifest
    }

    #[test]
    fn test_select_preserves_manifest_order() {
        let registry = SchemaLoader::parse_registry(REGISTRY).unwrap();
        let targets = RegionSelector::select(&manifest(&["dev-b", "dev-a"]), &registry).unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["dev-b", "dev-a"]);
        assert_eq!(targets[0].cluster.api, "https://127.0.0.1:6443");
    }

    #[test]
    fn test_unknown_region() {
        let registry = SchemaLoader::parse_registry(REGISTRY).unwrap();
        let err = RegionSelector::select(&manifest(&["dev-a", "staging"]), &registry).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownRegion(ref r) if r == "staging"));
    }

    #[test]
    fn test_dangling_cluster() {
        let registry = SchemaLoader::parse_registry(REGISTRY).unwrap();
        let err = RegionSelector::select(&manifest(&["orphan"]), &registry).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownCluster { ref region, ref cluster } if region == "orphan" && cluster == "gone"
        ));
    }

    #[test]
    fn test_select_only() {
        let registry = SchemaLoader::parse_registry(REGISTRY).unwrap();
        let manifest = manifest(&["dev-a", "dev-b"]);

        let targets = RegionSelector::select_only(&manifest, &registry, &["dev-b".to_string()]).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name(), "dev-b");

        let err = RegionSelector::select_only(&manifest, &registry, &["orphan".to_string()]).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownRegion(_)));
    }
}
