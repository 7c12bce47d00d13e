//! Error types for manifest and registry loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while loading or validating input documents.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// Malformed input. `field` is the dotted path of the offending field.
    #[error("Validation failed at '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpecError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convert a YAML deserialization error into a validation error.
    ///
    /// serde_yaml prefixes nested errors with the field path (`resources.limits: ...`)
    /// and reports absent fields as ``missing field `name` ``.
    pub fn from_yaml(err: serde_yaml::Error) -> Self {
        let message = err.to_string();
        let field = field_from_yaml_message(&message).unwrap_or_else(|| "document".to_string());
        Self::Validation { field, message }
    }
}

fn field_from_yaml_message(message: &str) -> Option<String> {
    let prefix = message
        .split_once(": ")
        .map(|(head, _)| head)
        .filter(|head| !head.is_empty() && !head.contains(' '));

    let named = message
        .split_once("field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name);

    match (prefix, named) {
        (Some(path), Some(name)) if message.contains("missing field") => {
            Some(format!("{}.{}", path, name))
        }
        (Some(path), _) => Some(path.to_string()),
        (None, Some(name)) => Some(name.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_missing_field() {
        assert_eq!(
            field_from_yaml_message("missing field `name` at line 1 column 1"),
            Some("name".to_string())
        );
    }

    #[test]
    fn test_field_from_nested_path() {
        assert_eq!(
            field_from_yaml_message("resources.limits: missing field `cpu` at line 4 column 5"),
            Some("resources.limits.cpu".to_string())
        );
        assert_eq!(
            field_from_yaml_message("replicaCount: invalid type: string \"x\", expected u32"),
            Some("replicaCount".to_string())
        );
    }
}
