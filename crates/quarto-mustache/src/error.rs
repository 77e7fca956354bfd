/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation, loading and rendering.

use thiserror::Error;

/// Errors that can occur during template operations.
///
/// Unknown tag names and malformed tags are never errors: they are resolved
/// by policy (left as literal text or dropped). Only the conditions below
/// stop a compile or a render.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A delimiter string was empty.
    #[error("Invalid delimiters: {message}")]
    InvalidDelimiters { message: String },

    /// The tag pattern built from the delimiters did not compile.
    #[error("Invalid tag pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Context data could not be converted (e.g. a JSON document that is not an object).
    #[error("Invalid context: {message}")]
    InvalidContext { message: String },

    /// A variable was not found while rendering in strict mode.
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// A partial resource was not found while rendering in strict mode.
    #[error("Partial not found: {name}")]
    PartialNotFound { name: String },

    /// A partial resource could not be read while rendering in strict mode.
    #[error("Partial '{name}' could not be read: {source}")]
    PartialUnreadable {
        name: String,
        source: std::io::Error,
    },

    /// Sections nest deeper than the parser accepts.
    #[error("Sections nested deeper than {max_depth} levels")]
    NestingTooDeep { max_depth: usize },

    /// Recursive partial inclusion detected.
    #[error("Recursive partial inclusion detected (depth > {max_depth}): {name}")]
    RecursivePartial { name: String, max_depth: usize },

    /// Options or context JSON could not be deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g., reading a template file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Failure reported by a [`ContentLoader`](crate::loader::ContentLoader).
#[derive(Debug, Error)]
pub enum LoadError {
    /// No resource exists under the identifier.
    #[error("resource not found: {identifier}")]
    NotFound { identifier: String },

    /// The resource exists but could not be read.
    #[error("failed to read {identifier}: {source}")]
    Io {
        identifier: String,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Convert into the error raised by a strict render for partial `name`.
    pub fn into_template_error(self, name: &str) -> TemplateError {
        match self {
            LoadError::NotFound { .. } => TemplateError::PartialNotFound {
                name: name.to_string(),
            },
            LoadError::Io { source, .. } => TemplateError::PartialUnreadable {
                name: name.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_partial_not_found() {
        let err = LoadError::NotFound {
            identifier: "header.mustache".to_string(),
        }
        .into_template_error("header");
        assert!(matches!(err, TemplateError::PartialNotFound { ref name } if name == "header"));
        assert_eq!(err.to_string(), "Partial not found: header");
    }

    #[test]
    fn test_io_maps_to_partial_unreadable() {
        let err = LoadError::Io {
            identifier: "header.mustache".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into_template_error("header");
        assert!(matches!(err, TemplateError::PartialUnreadable { .. }));
        assert!(err.to_string().starts_with("Partial 'header' could not be read"));
    }

    #[test]
    fn test_recursive_partial_message() {
        let err = TemplateError::RecursivePartial {
            name: "loop".to_string(),
            max_depth: 50,
        };
        assert_eq!(
            err.to_string(),
            "Recursive partial inclusion detected (depth > 50): loop"
        );
    }
}
