//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template {name} not found in any of {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("Template {template} references undefined variable '{variable}'")]
    UndefinedVariable { template: String, variable: String },

    #[error("Template {template} has an invalid placeholder '{placeholder}'")]
    InvalidPlaceholder { template: String, placeholder: String },

    #[error("Template {0} was not loaded")]
    NotLoaded(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
