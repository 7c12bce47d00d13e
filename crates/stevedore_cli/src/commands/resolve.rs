//! Resolve command - Run the full pipeline.

use anyhow::Result;
use clap::Args;
use tracing::info;

use stevedore_core::kube::{self, KubeObject};
use stevedore_core::{ResolvedDeployment, Resolver};

use super::{print_documents, InputArgs, OutputFormat, StoreArgs};
use crate::config::Settings;

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    store: StoreArgs,

    /// Only resolve these regions (repeatable; defaults to all declared)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Emit Kubernetes objects instead of resolved deployments
    #[arg(long)]
    pub kube: bool,

    /// Mask secret values in the output
    #[arg(long)]
    pub redact: bool,

    /// Regions resolved concurrently (overrides the settings file)
    #[arg(long)]
    pub parallelism: Option<usize>,
}

pub async fn execute(args: ResolveArgs, settings: &Settings) -> Result<()> {
    let (manifest, registry) = args.input.load()?;
    let loader = args.input.template_loader(settings);
    let store = args.store.store(settings)?;
    info!("Resolving {} using the {} store", manifest.name, store.name());

    let resolver = Resolver::new(store)
        .with_parallelism(args.parallelism.unwrap_or_else(|| settings.parallelism()))
        .with_secret_timeout(settings.secret_timeout());

    let run = resolver
        .run(&manifest, &registry, &loader, &args.regions)
        .await?;

    let deployments: Vec<ResolvedDeployment> = if args.redact {
        run.deployments.iter().map(ResolvedDeployment::redacted).collect()
    } else {
        run.deployments
    };

    if args.kube {
        let objects: Vec<KubeObject> = deployments.iter().flat_map(kube::lower).collect();
        print_documents(&objects, args.format)
    } else {
        print_documents(&deployments, args.format)
    }
}
