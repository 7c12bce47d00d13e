//! Manifest Emitter: assembles a `ResolvedDeployment` for one region.

use std::collections::BTreeMap;

use stevedore_spec::{Region, RegionRegistry, ServiceManifest};
use stevedore_templates::TemplateContext;

use crate::deployment::ResolvedDeployment;
use crate::error::{ResolveError, ResolveResult};
use crate::secrets::ResolvedEnv;
use crate::selector::RegionTarget;

/// Replica count when neither the manifest nor the registry sets one.
pub const DEFAULT_REPLICAS: u32 = 1;

/// Version deployed to a region: the region pin if any, else the manifest
/// version. It must satisfy the region's versioning scheme.
pub fn effective_version(manifest: &ServiceManifest, region: &Region) -> ResolveResult<String> {
    let version = region
        .pinned_version(&manifest.name)
        .or(manifest.version.as_deref())
        .ok_or_else(|| {
            ResolveError::validation(
                "version",
                format!(
                    "{} has no version and region {} does not pin one",
                    manifest.name, region.name
                ),
            )
        })?;

    if !region.versioning_scheme.accepts(version) {
        return Err(ResolveError::validation(
            "version",
            format!(
                "version '{}' does not satisfy the {:?} scheme of region {}",
                version, region.versioning_scheme, region.name
            ),
        ));
    }
    Ok(version.to_string())
}

/// Image for a service, falling back to the registry image prefix.
pub fn effective_image(manifest: &ServiceManifest, registry: &RegionRegistry) -> ResolveResult<String> {
    registry
        .image_for(&manifest.name, manifest.image.as_deref())
        .ok_or_else(|| {
            ResolveError::validation(
                "image",
                format!("{} has no image and the registry has no imagePrefix", manifest.name),
            )
        })
}

pub fn effective_replicas(manifest: &ServiceManifest, registry: &RegionRegistry) -> u32 {
    manifest
        .replica_count
        .or(registry.defaults.replica_count)
        .unwrap_or(DEFAULT_REPLICAS)
}

/// Builds deployments in two steps so every region can be checked before any
/// secret is fetched.
pub struct ManifestEmitter;

impl ManifestEmitter {
    /// Everything that does not depend on secrets or templates.
    pub fn prepare(
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
        target: &RegionTarget<'_>,
    ) -> ResolveResult<ResolvedDeployment> {
        let region = target.region;
        Ok(ResolvedDeployment {
            service: manifest.name.clone(),
            region: region.name.clone(),
            environment: region.environment.clone(),
            cluster: target.cluster.name.clone(),
            api_server: target.cluster.api.clone(),
            namespace: registry.namespace_for(region, &manifest.metadata.team),
            reconciliation_mode: region.reconciliation_mode,
            vault_folder: region.vault.folder.clone(),
            team: manifest.metadata.team.clone(),
            image: effective_image(manifest, registry)?,
            version: effective_version(manifest, region)?,
            replica_count: effective_replicas(manifest, registry),
            resources: manifest.resources.clone(),
            health: manifest.health.clone(),
            http_port: manifest.http_port,
            config_mount: manifest.configs.as_ref().map(|c| c.mount.clone()),
            config_files: BTreeMap::new(),
            env: BTreeMap::new(),
            secrets: BTreeMap::new(),
        })
    }

    /// Variables available to templates for a prepared deployment.
    pub fn template_context(deployment: &ResolvedDeployment, env: &ResolvedEnv) -> TemplateContext {
        TemplateContext::new()
            .with_value("service", &deployment.service)
            .with_value("version", &deployment.version)
            .with_value("image", &deployment.image)
            .with_value("region", &deployment.region)
            .with_value("environment", &deployment.environment)
            .with_value("namespace", &deployment.namespace)
            .with_value("cluster", &deployment.cluster)
            .with_env(env.all())
    }

    /// Attach resolved values and rendered files.
    pub fn complete(
        mut deployment: ResolvedDeployment,
        env: ResolvedEnv,
        config_files: BTreeMap<String, String>,
    ) -> ResolvedDeployment {
        deployment.env = env.plain;
        deployment.secrets = env.secrets;
        deployment.config_files = config_files;
        deployment
    }
}
