//! # stevedore_core
//!
//! Resolution pipeline for stevedore.
//!
//! Takes a validated service manifest and region registry and produces one
//! fully resolved deployment per target region.
//!
//! # Architecture
//!
//! - **Selector**: maps declared region names onto registry regions and clusters
//! - **Secrets**: layers the environment and fetches secret values from a store
//! - **Emitter**: assembles a `ResolvedDeployment` and its template variables
//! - **Resolver**: runs the stages per region with bounded parallelism
//! - **Kube**: lowers a deployment to ConfigMap, Secret and Deployment objects
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stevedore_core::Resolver;
//! use stevedore_spec::SchemaLoader;
//! use stevedore_templates::TemplateLoader;
//! use stevedore_vault::MemoryStore;
//!
//! let manifest = SchemaLoader::load_manifest("services/webapp/manifest.yml")?;
//! let registry = SchemaLoader::load_registry("shipcat.conf")?;
//! let loader = TemplateLoader::for_service("services/webapp", ".");
//!
//! let resolver = Resolver::new(Arc::new(MemoryStore::new())).with_parallelism(4);
//! let deployments = resolver.resolve(&manifest, &registry, &loader).await?;
//! ```

pub mod deployment;
pub mod emitter;
pub mod error;
pub mod kube;
pub mod reducers;
pub mod resolver;
pub mod secrets;
pub mod selector;

pub use deployment::{ResolvedDeployment, REDACTED};
pub use emitter::{effective_image, effective_replicas, effective_version, ManifestEmitter};
pub use error::{ResolveError, ResolveResult};
pub use reducers::{ClusterInfo, ResourceAmount, ResourceBreakdown, ResourceTotals};
pub use resolver::{ResolutionRun, Resolver, DEFAULT_PARALLELISM};
pub use secrets::{layered_env, ResolvedEnv, SecretResolver, DEFAULT_SECRET_TIMEOUT};
pub use selector::{RegionSelector, RegionTarget};
