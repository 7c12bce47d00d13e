//! Template command - Print rendered config files for one region.

use anyhow::{Context, Result};
use clap::Args;

use stevedore_core::Resolver;

use super::{InputArgs, StoreArgs};
use crate::config::Settings;

#[derive(Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    store: StoreArgs,

    /// Region to render for
    #[arg(long)]
    region: String,

    /// Only print this destination file
    #[arg(long)]
    file: Option<String>,
}

pub async fn execute(args: TemplateArgs, settings: &Settings) -> Result<()> {
    let (manifest, registry) = args.input.load()?;
    let loader = args.input.template_loader(settings);
    let resolver = Resolver::new(args.store.store(settings)?)
        .with_secret_timeout(settings.secret_timeout());

    let mut deployments = resolver
        .resolve_regions(&manifest, &registry, &loader, &[args.region.clone()])
        .await?;
    let deployment = deployments
        .pop()
        .with_context(|| format!("{} has no deployment in {}", manifest.name, args.region))?;

    match &args.file {
        Some(dest) => {
            let content = deployment
                .config_files
                .get(dest)
                .with_context(|| format!("{} renders no file named {}", manifest.name, dest))?;
            print!("{}", content);
        }
        None => {
            for (dest, content) in &deployment.config_files {
                println!("# {}", dest);
                print!("{}", content);
            }
        }
    }
    Ok(())
}
