//! Error types for the resolution pipeline.

use stevedore_spec::SpecError;
use stevedore_templates::TemplateError;
use thiserror::Error;

/// Result type alias for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that abort a resolution run.
///
/// Every variant is fatal: the pipeline emits nothing once one is raised.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{0}")]
    Validation(#[from] SpecError),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Region {region} references unknown cluster {cluster}")]
    UnknownCluster { region: String, cluster: String },

    #[error("Secret {key} unavailable in region {region}: {reason}")]
    SecretUnavailable {
        region: String,
        key: String,
        reason: String,
    },

    #[error("{0}")]
    Template(#[from] TemplateError),
}

impl ResolveError {
    /// Validation failure at a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(SpecError::validation(field, message))
    }
}
