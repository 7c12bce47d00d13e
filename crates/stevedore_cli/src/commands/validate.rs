//! Validate command - Schema and registry cross validation.

use anyhow::Result;
use clap::Args;
use tracing::info;

use stevedore_spec::{SchemaLoader, SpecValidator};

use super::{load_registry, CliError, InputArgs};
use crate::config::Settings;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    input: InputArgs,
}

pub async fn execute(args: ValidateArgs, settings: &Settings) -> Result<()> {
    info!("Validating {}", args.input.manifest.display());

    let registry = load_registry(&args.input.registry)?;
    let manifest = SchemaLoader::load_manifest(&args.input.manifest)?;

    let mut result = SpecValidator::validate_registry_references(&registry);
    result.merge(SpecValidator::validate_manifest(&manifest));
    result.merge(SpecValidator::validate_against_registry(&manifest, &registry));

    // Config bindings must point at a template that exists.
    let loader = args.input.template_loader(settings);
    for (i, file) in manifest.config_files().iter().enumerate() {
        if loader.locate(&file.name).is_none() {
            result.add_error(
                format!("configs.files[{}].name", i),
                format!("template {} not found in {:?}", file.name, loader.search_paths()),
            );
        }
    }

    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if result.valid {
        println!("✅ {} is valid for {} region(s)", manifest.name, manifest.regions.len());
        Ok(())
    } else {
        println!("❌ Validation failed:");
        for error in &result.errors {
            println!("      - {}", error);
        }
        Err(CliError::ValidationFailed(result.errors.len()).into())
    }
}
