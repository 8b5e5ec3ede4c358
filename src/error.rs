//! Custom error types for the library.
//!
//! This module defines the primary error type, `SimtoolsError`, shared by the metadata
//! assembler, the histogram table builder and the path resolver. Using the `thiserror`
//! crate, it provides a single place where every failure mode of this layer is named.
//!
//! ## Error Hierarchy
//!
//! `SimtoolsError` is an enum that consolidates various error sources:
//!
//! - **`MissingKey`**: A required field is absent from a workflow configuration, a user
//!   metadata document or a metadata template. The payload is the dotted key path
//!   (e.g. `PRODUCT.ASSOCIATION.SITE`).
//! - **`InvalidValue`**: A field is present but its value is outside a closed set, such as
//!   an unknown site name during instrument-name derivation.
//! - **`IncompleteInit`**: The path resolver was used before the relevant root path was
//!   configured. This is resolver misconfiguration, not malformed input, and is kept apart
//!   from `MissingKey` for that reason.
//! - **`AmbiguousDirType`**: An output directory was requested with a sub-directory but
//!   with an explicitly unset directory type.
//! - **`ShapeMismatch`**: Histogram contents and bin edges disagree in shape.
//! - **`Io`**, **`Arrow`**, **`Yaml`**, **`Json`**, **`Config`**: Wrapped errors from the
//!   file system and the serialization/configuration crates.
//!
//! By using `#[from]`, `SimtoolsError` can be created from the underlying error types,
//! so the `?` operator works throughout the crate.

use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type SimtoolsResult<T> = std::result::Result<T, SimtoolsError>;

/// Errors raised by metadata assembly, histogram tables and path resolution.
#[derive(Error, Debug)]
pub enum SimtoolsError {
    /// Required key absent; holds the dotted key path.
    #[error("Missing required key: {0}")]
    MissingKey(String),

    /// Value outside its allowed set.
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue {
        /// Dotted key path or parameter name.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// Path resolver used before the named root path was set.
    #[error("IO handler not initialized: {0} is not set")]
    IncompleteInit(String),

    /// Sub-directory requested with an unset directory type.
    #[error("Directory type must be set when a sub-directory is requested")]
    AmbiguousDirType,

    /// Histogram contents and bin edges disagree.
    #[error("Histogram shape mismatch: {0}")]
    ShapeMismatch(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow table or IPC error.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Figment configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for SimtoolsError {
    fn from(err: figment::Error) -> Self {
        SimtoolsError::Config(Box::new(err))
    }
}

impl SimtoolsError {
    /// Shorthand for a [`SimtoolsError::MissingKey`] from a dotted key path.
    pub fn missing(key: impl Into<String>) -> Self {
        SimtoolsError::MissingKey(key.into())
    }

    /// Shorthand for a [`SimtoolsError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, value: impl Into<String>) -> Self {
        SimtoolsError::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimtoolsError::missing("CTASIMPIPE.ACTIVITY.NAME");
        assert_eq!(
            err.to_string(),
            "Missing required key: CTASIMPIPE.ACTIVITY.NAME"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let err = SimtoolsError::invalid("PRODUCT.ASSOCIATION.SITE", "Neptun");
        assert!(err.to_string().contains("'Neptun'"));
        assert!(err.to_string().contains("PRODUCT.ASSOCIATION.SITE"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SimtoolsError = io.into();
        assert!(matches!(err, SimtoolsError::Io(_)));
    }
}
