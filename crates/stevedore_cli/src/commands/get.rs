//! Get command - Registry and manifest views.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::debug;

use stevedore_core::reducers;
use stevedore_spec::{SchemaLoader, ServiceManifest};

use super::{load_registry, print_value, InputArgs, OutputFormat};
use crate::config::Settings;

#[derive(Subcommand)]
pub enum GetCommand {
    /// Cluster, namespace and vault for a region
    Clusterinfo(RegionArgs),

    /// Effective version of every service in a region
    Versions(VersionsArgs),

    /// Effective image of every service
    Images(ServicesArgs),

    /// Total requests and limits for a service across its regions
    Resources(ResourcesArgs),

    /// Requests and limits of every service split by team, for one region or all
    Breakdown(BreakdownArgs),

    /// GitHub CODEOWNERS lines from team owners
    Codeowners(SourceArgs),

    /// Vault policy (HCL) for a team's services in a region
    Vaultpolicy(VaultpolicyArgs),
}

#[derive(Args)]
pub struct RegionArgs {
    /// Region registry
    #[arg(short, long, env = "STEVEDORE_REGISTRY")]
    registry: PathBuf,

    /// Region name
    #[arg(long)]
    region: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Region registry
    #[arg(short, long, env = "STEVEDORE_REGISTRY")]
    registry: PathBuf,

    /// Directory containing services/<name>/manifest.yml
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

impl SourceArgs {
    fn manifests(&self) -> Result<Vec<ServiceManifest>> {
        let found = SchemaLoader::discover_manifests(&self.root)
            .with_context(|| format!("Failed to discover services under {}", self.root.display()))?;
        debug!("Discovered {} services", found.len());
        Ok(found.into_iter().map(|(_, manifest)| manifest).collect())
    }
}

#[derive(Args)]
pub struct ServicesArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

#[derive(Args)]
pub struct VersionsArgs {
    #[command(flatten)]
    services: ServicesArgs,

    /// Region name
    #[arg(long)]
    region: String,
}

#[derive(Args)]
pub struct ResourcesArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

#[derive(Args)]
pub struct BreakdownArgs {
    #[command(flatten)]
    services: ServicesArgs,

    /// Only count this region (defaults to every registry region)
    #[arg(long)]
    region: Option<String>,
}

#[derive(Args)]
pub struct VaultpolicyArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Region name
    #[arg(long)]
    region: String,

    /// Team name
    #[arg(long)]
    team: String,
}

pub async fn execute(command: GetCommand, settings: &Settings) -> Result<()> {
    match command {
        GetCommand::Clusterinfo(args) => {
            let registry = load_registry(&args.registry)?;
            let info = reducers::clusterinfo(&registry, &args.region)?;
            print_value(&info, args.format)
        }
        GetCommand::Versions(args) => {
            let registry = load_registry(&args.services.source.registry)?;
            let manifests = args.services.source.manifests()?;
            let versions = reducers::versions(&manifests, &registry, &args.region)?;
            print_value(&versions, args.services.format)
        }
        GetCommand::Images(args) => {
            let registry = load_registry(&args.source.registry)?;
            let images = reducers::images(&args.source.manifests()?, &registry)?;
            print_value(&images, args.format)
        }
        GetCommand::Resources(args) => {
            let (manifest, registry) = args.input.load()?;
            let totals = reducers::resource_totals(&manifest, &registry)?;
            print_value(&totals, args.format)
        }
        GetCommand::Breakdown(args) => {
            let registry = load_registry(&args.services.source.registry)?;
            let manifests = args.services.source.manifests()?;
            let breakdown = match &args.region {
                Some(region) => reducers::resources_region(&manifests, &registry, region)?,
                None => reducers::total_resources(&manifests, &registry)?,
            };
            print_value(&breakdown.normalise(), args.services.format)
        }
        GetCommand::Codeowners(args) => {
            let registry = load_registry(&args.registry)?;
            for line in reducers::codeowners(&args.manifests()?, &registry) {
                println!("{}", line);
            }
            Ok(())
        }
        GetCommand::Vaultpolicy(args) => {
            let registry = load_registry(&args.source.registry)?;
            let mount = settings.vault_config(None).mount;
            let policy = reducers::vaultpolicy(
                &args.source.manifests()?,
                &registry,
                &args.region,
                &args.team,
                &mount,
            )?;
            print!("{}", policy);
            Ok(())
        }
    }
}
