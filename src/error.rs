//! Error types for schema loading, preparation and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Message carried by [`PrepareError::Incompatible`]. Stable; callers may
/// match on it.
pub const INCOMPATIBLE_SCHEMA_MESSAGE: &str = "Schema contains invalid structure for the structured-output model: \
object type with no 'properties' defined but 'additionalProperties: true' \
(schema-less dictionary not supported). Please define specific properties for your object. \
Note: Recursive schemas using '$ref' are supported.";

/// Errors while preparing a schema for an extraction request.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("{}", INCOMPATIBLE_SCHEMA_MESSAGE)]
    Incompatible,

    #[error("{message}")]
    InvalidJsonFormat { message: String },

    #[error("invalid schema type: {actual}; schema must be a JSON object")]
    InvalidSchemaType { actual: String },
}

impl PrepareError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while loading a schema or payload.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors while validating extracted data.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<Violation> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Prepare(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_message_is_stable() {
        let err = PrepareError::Incompatible;
        assert_eq!(err.to_string(), INCOMPATIBLE_SCHEMA_MESSAGE);
        assert!(err.to_string().contains("invalid structure"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LoadError::InvalidJson { source };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![Violation {
                path: "/name".into(),
                message: "missing required field".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::from(PrepareError::Incompatible);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), INCOMPATIBLE_SCHEMA_MESSAGE);
    }

    #[test]
    fn violation_display() {
        let err = Violation {
            path: "/items/0/price".into(),
            message: "expected number, got string".into(),
        };
        assert_eq!(err.to_string(), "/items/0/price: expected number, got string");
    }
}
