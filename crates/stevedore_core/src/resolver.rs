//! The resolution pipeline.
//!
//! Schema-loaded inputs go through the Region Selector, then every region is
//! prepared and checked before any secret is fetched. Secret lookups and
//! rendering then run with bounded parallelism; output keeps manifest order
//! and the first failure aborts the whole run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use stevedore_spec::{RegionRegistry, ServiceManifest};
use stevedore_templates::{TemplateLoader, TemplateRenderer, TemplateSet};
use stevedore_vault::SecretStore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::deployment::ResolvedDeployment;
use crate::emitter::ManifestEmitter;
use crate::error::ResolveResult;
use crate::secrets::{layered_env, SecretResolver};
use crate::selector::{RegionSelector, RegionTarget};

/// Regions resolved concurrently by default.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Record of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRun {
    pub id: Uuid,
    pub service: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub deployments: Vec<ResolvedDeployment>,
}

impl ResolutionRun {
    pub fn regions(&self) -> Vec<&str> {
        self.deployments.iter().map(|d| d.region.as_str()).collect()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Resolves a service manifest into one deployment per region.
pub struct Resolver {
    secrets: SecretResolver,
    renderer: TemplateRenderer,
    parallelism: usize,
}

impl Resolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets: SecretResolver::new(store),
            renderer: TemplateRenderer::new(),
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    /// Maximum regions in flight at once (at least one).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.secrets = self.secrets.with_timeout(timeout);
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Resolve every region the manifest declares.
    pub async fn resolve(
        &self,
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
        loader: &TemplateLoader,
    ) -> ResolveResult<Vec<ResolvedDeployment>> {
        self.resolve_regions(manifest, registry, loader, &[]).await
    }

    /// Resolve a subset of the declared regions; an empty subset means all.
    pub async fn resolve_regions(
        &self,
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
        loader: &TemplateLoader,
        only: &[String],
    ) -> ResolveResult<Vec<ResolvedDeployment>> {
        let targets = RegionSelector::select_only(manifest, registry, only)?;
        let templates = loader.load_all(manifest.config_files())?;

        let prepared = targets
            .into_iter()
            .map(|target| {
                ManifestEmitter::prepare(manifest, registry, &target).map(|d| (target, d))
            })
            .collect::<ResolveResult<Vec<_>>>()?;

        info!(
            "Resolving {} across {} regions (parallelism {})",
            manifest.name,
            prepared.len(),
            self.parallelism
        );

        stream::iter(prepared)
            .map(|(target, deployment)| {
                self.finish_region(manifest, registry, target, deployment, &templates)
            })
            .buffered(self.parallelism)
            .try_collect::<Vec<_>>()
            .await
    }

    /// Resolve and wrap the result in a run record.
    pub async fn run(
        &self,
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
        loader: &TemplateLoader,
        only: &[String],
    ) -> ResolveResult<ResolutionRun> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        debug!("Run {} started for {}", id, manifest.name);

        let deployments = self.resolve_regions(manifest, registry, loader, only).await?;

        let run = ResolutionRun {
            id,
            service: manifest.name.clone(),
            started_at,
            finished_at: Utc::now(),
            deployments,
        };
        info!(
            "Run {} resolved {} regions for {} in {}ms",
            run.id,
            run.deployments.len(),
            run.service,
            run.duration_ms()
        );
        Ok(run)
    }

    async fn finish_region(
        &self,
        manifest: &ServiceManifest,
        registry: &RegionRegistry,
        target: RegionTarget<'_>,
        deployment: ResolvedDeployment,
        templates: &TemplateSet,
    ) -> ResolveResult<ResolvedDeployment> {
        let env = layered_env(registry, manifest, target.region);
        let resolved = self.secrets.resolve(&manifest.name, target.region, &env).await?;

        let context = ManifestEmitter::template_context(&deployment, &resolved);
        let files: BTreeMap<String, String> =
            self.renderer
                .render_files(templates, manifest.config_files(), &context)?;

        info!(
            "Resolved {} in {} ({} env, {} secrets, {} files)",
            manifest.name,
            target.name(),
            resolved.plain.len(),
            resolved.secrets.len(),
            files.len()
        );
        Ok(ManifestEmitter::complete(deployment, resolved, files))
    }
}
