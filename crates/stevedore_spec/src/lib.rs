//! # stevedore_spec
//!
//! Input schemas for stevedore: the service manifest and the
//! cluster/region/team registry.
//!
//! This crate is the schema loader of the resolver. It parses YAML, applies
//! structural validation and reports the offending field when input is
//! malformed. Nothing here performs I/O beyond reading the given files.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stevedore_spec::{SchemaLoader, SpecValidator};
//!
//! let manifest = SchemaLoader::load_manifest("services/webapp/manifest.yml").unwrap();
//! let registry = SchemaLoader::load_registry("registry.yml").unwrap();
//!
//! let result = SpecValidator::validate_against_registry(&manifest, &registry);
//! for issue in &result.errors {
//!     eprintln!("Error: {}", issue);
//! }
//! ```

pub mod error;
pub mod models;
pub mod quantity;
pub mod reader;
pub mod registry;
pub mod validator;

pub use error::{SpecError, SpecResult};
pub use models::*;
pub use reader::{SchemaLoader, MANIFEST_FILE};
pub use registry::{
    Cluster, GithubSettings, ReconciliationMode, Region, RegionRegistry, RegistryDefaults, Team,
    VaultSettings, VersioningScheme,
};
pub use validator::{SpecValidator, ValidationIssue, ValidationResult};
