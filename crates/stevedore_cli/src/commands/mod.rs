//! CLI command definitions.
//!
//! Each subcommand maps to one stage or view of the resolution pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use stevedore_spec::{RegionRegistry, SchemaLoader, ServiceManifest};
use stevedore_templates::TemplateLoader;
use stevedore_vault::{MemoryStore, SecretStore, VaultClient};

use crate::config::Settings;

pub mod get;
pub mod resolve;
pub mod template;
pub mod validate;

/// stevedore - deployment configuration resolver
#[derive(Parser)]
#[command(name = "stevedore")]
#[command(version, about = "stevedore - deployment configuration resolver")]
#[command(long_about = r#"
stevedore turns a service manifest and a cluster/region registry into one
fully resolved deployment per target region.

COMMANDS:
  validate  → Schema and registry cross validation
  resolve   → Resolve every region (YAML/JSON or Kubernetes objects)
  template  → Print rendered config files for one region
  get       → Registry and manifest views

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Template error
  5 - Secret store error
  6 - Unknown region or cluster
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Settings file (defaults to ./stevedore.toml when present)
    #[arg(long, global = true, env = "STEVEDORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a manifest against a registry
    Validate(validate::ValidateArgs),

    /// Resolve a manifest into per-region deployments
    Resolve(resolve::ResolveArgs),

    /// Render config files for one region
    Template(template::TemplateArgs),

    /// Query the registry and manifests
    #[command(subcommand)]
    Get(get::GetCommand),
}

/// Manifest and registry inputs shared by most commands.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Service manifest
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Region registry
    #[arg(short, long, env = "STEVEDORE_REGISTRY")]
    pub registry: PathBuf,
}

impl InputArgs {
    pub fn load(&self) -> Result<(ServiceManifest, RegionRegistry)> {
        let manifest = SchemaLoader::load_manifest(&self.manifest)
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;
        let registry = load_registry(&self.registry)?;
        Ok((manifest, registry))
    }

    /// Templates resolve from the manifest directory, then the shared directory.
    pub fn template_loader(&self, settings: &Settings) -> TemplateLoader {
        let service_dir = parent_dir(&self.manifest);
        let shared = settings
            .templates_dir
            .clone()
            .unwrap_or_else(|| parent_dir(&self.registry).join("templates"));
        TemplateLoader::new(vec![service_dir, shared])
    }
}

/// Secret store selection shared by commands that resolve secrets.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// YAML file of `folder/service/KEY: value` used instead of Vault
    #[arg(long)]
    pub secrets_file: Option<PathBuf>,

    /// Vault token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub vault_token: Option<String>,
}

impl StoreArgs {
    pub fn store(&self, settings: &Settings) -> Result<Arc<dyn SecretStore>> {
        match &self.secrets_file {
            Some(path) => {
                info!("Using secrets file {}", path.display());
                let store = MemoryStore::from_yaml_file(path)
                    .with_context(|| format!("Failed to load secrets file {}", path.display()))?;
                Ok(Arc::new(store))
            }
            None => {
                let config = settings.vault_config(self.vault_token.clone());
                Ok(Arc::new(VaultClient::new(&config)?))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Errors raised by the CLI itself rather than a library.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation failed with {0} error(s)")]
    ValidationFailed(usize),
}

pub fn load_registry(path: &Path) -> Result<RegionRegistry> {
    SchemaLoader::load_registry(path)
        .with_context(|| format!("Failed to load registry {}", path.display()))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print values as a YAML stream or a JSON array.
pub fn print_documents<T: Serialize>(documents: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            for document in documents {
                print!("---\n{}", serde_yaml::to_string(document)?);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(documents)?),
    }
    Ok(())
}

/// Print a single value.
pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
