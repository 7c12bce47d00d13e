//! Read-only views over manifests and the registry.

use std::collections::BTreeMap;

use serde::Serialize;
use stevedore_spec::{RegionRegistry, ResourceRequest, ServiceManifest};
use tracing::{debug, warn};

use crate::emitter::{effective_image, effective_replicas, effective_version};
use crate::error::{ResolveError, ResolveResult};
use crate::selector::RegionSelector;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Where a region lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub region: String,
    pub namespace: String,
    pub environment: String,
    pub apiserver: String,
    pub cluster: String,
    pub vault: String,
}

pub fn clusterinfo(registry: &RegionRegistry, region: &str) -> ResolveResult<ClusterInfo> {
    let target = RegionSelector::target(registry, region)?;
    Ok(ClusterInfo {
        region: target.region.name.clone(),
        namespace: target.region.namespace.clone(),
        environment: target.region.environment.clone(),
        apiserver: target.cluster.api.clone(),
        cluster: target.cluster.name.clone(),
        vault: target.region.vault.url.clone(),
    })
}

/// Effective version of every service deployed to `region`.
pub fn versions(
    manifests: &[ServiceManifest],
    registry: &RegionRegistry,
    region: &str,
) -> ResolveResult<BTreeMap<String, String>> {
    let region = registry
        .region(region)
        .ok_or_else(|| ResolveError::UnknownRegion(region.to_string()))?;

    manifests
        .iter()
        .filter(|m| m.deploys_to(&region.name))
        .map(|m| effective_version(m, region).map(|v| (m.name.clone(), v)))
        .collect()
}

/// Effective image of every service.
pub fn images(
    manifests: &[ServiceManifest],
    registry: &RegionRegistry,
) -> ResolveResult<BTreeMap<String, String>> {
    manifests
        .iter()
        .map(|m| effective_image(m, registry).map(|i| (m.name.clone(), i)))
        .collect()
}

/// CPU cores and memory in GiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceAmount {
    pub cores: f64,
    pub memory_gib: f64,
}

impl ResourceAmount {
    fn from_request(request: &ResourceRequest, field: &str) -> ResolveResult<Self> {
        let cores = request.cpu_cores().ok_or_else(|| {
            ResolveError::validation(format!("{}.cpu", field), format!("cannot parse '{}'", request.cpu))
        })?;
        let bytes = request.memory_bytes().ok_or_else(|| {
            ResolveError::validation(
                format!("{}.memory", field),
                format!("cannot parse '{}'", request.memory),
            )
        })?;
        Ok(Self {
            cores,
            memory_gib: bytes / GIB,
        })
    }

    fn add_scaled(&mut self, other: Self, factor: u32) {
        self.cores += other.cores * f64::from(factor);
        self.memory_gib += other.memory_gib * f64::from(factor);
    }

    /// Round to whole cores and GiB.
    fn round(&mut self) {
        self.cores = self.cores.round();
        self.memory_gib = self.memory_gib.round();
    }
}

/// Requests and limits, times replicas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResourceTotals {
    pub requests: ResourceAmount,
    pub limits: ResourceAmount,
}

impl ResourceTotals {
    fn add(&mut self, other: Self) {
        self.requests.add_scaled(other.requests, 1);
        self.limits.add_scaled(other.limits, 1);
    }

    fn round(&mut self) {
        self.requests.round();
        self.limits.round();
    }
}

/// Requests and limits of one service in one region.
fn region_totals(
    manifest: &ServiceManifest,
    registry: &RegionRegistry,
) -> ResolveResult<ResourceTotals> {
    let requests = ResourceAmount::from_request(&manifest.resources.requests, "resources.requests")?;
    let limits = ResourceAmount::from_request(&manifest.resources.limits, "resources.limits")?;
    let replicas = effective_replicas(manifest, registry);

    let mut totals = ResourceTotals::default();
    totals.requests.add_scaled(requests, replicas);
    totals.limits.add_scaled(limits, replicas);
    Ok(totals)
}

/// Requests and limits of one service summed over every region it deploys to.
pub fn resource_totals(
    manifest: &ServiceManifest,
    registry: &RegionRegistry,
) -> ResolveResult<ResourceTotals> {
    let per_region = region_totals(manifest, registry)?;
    let mut totals = ResourceTotals::default();
    for _ in RegionSelector::select(manifest, registry)? {
        totals.add(per_region);
    }
    Ok(totals)
}

/// Resource totals overall and split by owning team.
///
/// Every registry team is present, with zero totals when it owns nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceBreakdown {
    pub totals: ResourceTotals,
    pub teams: BTreeMap<String, ResourceTotals>,
}

impl ResourceBreakdown {
    pub fn new(registry: &RegionRegistry) -> Self {
        Self {
            totals: ResourceTotals::default(),
            teams: registry
                .teams
                .iter()
                .map(|t| (t.name.clone(), ResourceTotals::default()))
                .collect(),
        }
    }

    fn add(&mut self, team: &str, totals: ResourceTotals) {
        self.totals.add(totals);
        self.teams.entry(team.to_string()).or_default().add(totals);
    }

    fn merge(&mut self, other: Self) {
        self.totals.add(other.totals);
        for (team, totals) in other.teams {
            self.teams.entry(team).or_default().add(totals);
        }
    }

    /// Round every amount to whole cores and GiB.
    pub fn normalise(mut self) -> Self {
        self.totals.round();
        for totals in self.teams.values_mut() {
            totals.round();
        }
        self
    }
}

/// Resource use of every service deployed to `region`.
pub fn resources_region(
    manifests: &[ServiceManifest],
    registry: &RegionRegistry,
    region: &str,
) -> ResolveResult<ResourceBreakdown> {
    let region = registry
        .region(region)
        .ok_or_else(|| ResolveError::UnknownRegion(region.to_string()))?;

    let mut breakdown = ResourceBreakdown::new(registry);
    for manifest in manifests.iter().filter(|m| m.deploys_to(&region.name)) {
        breakdown.add(&manifest.metadata.team, region_totals(manifest, registry)?);
    }
    Ok(breakdown)
}

/// Resource use summed over every registry region.
pub fn total_resources(
    manifests: &[ServiceManifest],
    registry: &RegionRegistry,
) -> ResolveResult<ResourceBreakdown> {
    let mut breakdown = ResourceBreakdown::new(registry);
    for region in &registry.regions {
        breakdown.merge(resources_region(manifests, registry, &region.name)?);
    }
    Ok(breakdown)
}

/// GitHub CODEOWNERS lines, one per service whose team has owners.
///
/// Owners are the team's `githubAdmins` group within the registry
/// organisation, then each owner's GitHub handle.
pub fn codeowners(manifests: &[ServiceManifest], registry: &RegionRegistry) -> Vec<String> {
    let org = registry.github.as_ref().map(|g| g.organisation.as_str());
    let mut lines = Vec::new();

    for manifest in manifests {
        let Some(team) = registry.team(&manifest.metadata.team) else {
            warn!(
                "No team {} in the registry, skipping {}",
                manifest.metadata.team, manifest.name
            );
            continue;
        };
        if team.owners.is_empty() {
            continue;
        }

        let mut ids = Vec::new();
        match (org, &team.github_admins) {
            (Some(org), Some(admins)) => ids.push(format!("@{}/{}", org, admins)),
            (None, Some(admins)) => {
                warn!("Team {} has githubAdmins {} but no github organisation is set", team.name, admins)
            }
            _ => {}
        }
        for owner in &team.owners {
            match &owner.github {
                Some(handle) => ids.push(format!("@{}", handle)),
                None => warn!("Owner {} of team {} has no github handle", owner.name, team.name),
            }
        }

        if !ids.is_empty() {
            lines.push(format!("services/{}/* {}", manifest.name, ids.join(" ")));
        }
    }
    lines
}

/// Vault policy (HCL) granting a team access to its services' secrets in
/// one region.
///
/// Dev regions grant read; other environments allow writing and rotating
/// secrets without reading them back.
pub fn vaultpolicy(
    manifests: &[ServiceManifest],
    registry: &RegionRegistry,
    region: &str,
    team: &str,
    mount: &str,
) -> ResolveResult<String> {
    let region = registry
        .region(region)
        .ok_or_else(|| ResolveError::UnknownRegion(region.to_string()))?;
    let team = registry
        .team(team)
        .ok_or_else(|| ResolveError::UnknownTeam(team.to_string()))?;
    if team.github_admins.is_none() {
        warn!("Team {} does not define githubAdmins", team.name);
    }

    let capabilities = if region.environment == "dev" {
        r#"["create", "read", "update", "delete", "list"]"#
    } else {
        r#"["create", "update", "delete", "list"]"#
    };
    let folder = format!("{}/{}", mount.trim_matches('/'), region.vault.folder);

    let mut services: Vec<&str> = manifests
        .iter()
        .filter(|m| m.metadata.team == team.name)
        .map(|m| m.name.as_str())
        .collect();
    services.sort_unstable();
    debug!("Policy for {} covers {} services", team.name, services.len());

    let mut policy = format!(
        "# {} secrets in {} ({})\npath \"{}/*\" {{\n  capabilities = [\"list\"]\n}}\n",
        team.name, region.name, region.environment, folder
    );
    for service in services {
        policy.push_str(&format!(
            "path \"{}/{}/*\" {{\n  capabilities = {}\n}}\n",
            folder, service, capabilities
        ));
    }
    Ok(policy)
}
