use std::{
    fmt, io,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

use crate::transport::TransportError;

/// Error types for the observation registry.
///
/// Only caller mistakes and transport refusals surface here. Duplicate
/// registrations and unmatched removals are absorbed by the registry and
/// never become errors.
#[derive(Error, Debug)]
pub enum ObserveError {
    /// An argument passed to `add_observer`/`remove_observer` was rejected
    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Name of the rejected argument
        argument: &'static str,
        /// Reason why the argument is invalid
        reason: String,
    },

    /// A delivered value does not match the type a callback asked for
    #[error("type mismatch at {path}: expected {expected_type}, got {actual_value:?}")]
    TypeMismatch {
        /// The property whose value was extracted
        path: String,
        /// The expected type name
        expected_type: &'static str,
        /// The value that was delivered
        actual_value: toml::Value,
    },

    /// The change transport refused the operation
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration validation error
    #[error("configuration validation failed for '{component}': {details}")]
    Config {
        /// Component that failed validation
        component: String,
        /// Validation error details
        details: String,
    },

    /// TOML parsing error with location context
    #[error("failed to parse TOML at '{location}': {details}")]
    TomlParse {
        /// Location of TOML being parsed (file path or "string")
        location: String,
        /// Parse error details
        details: String,
    },

    /// I/O operation error
    #[error("I/O error on '{path}': {details}")]
    Io {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },
}

/// A specialized `Result` type for registry operations.
pub type Result<T> = result::Result<T, ObserveError>;

impl ObserveError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(argument: &'static str, reason: impl fmt::Display) -> Self {
        ObserveError::InvalidArgument {
            argument,
            reason: reason.to_string(),
        }
    }

    /// Creates a TOML parsing error with optional file path context.
    ///
    /// # Arguments
    ///
    /// * `error` - The underlying parsing error
    /// * `path` - Optional path to the file that failed to parse
    pub fn toml_parse(error: impl fmt::Display, path: Option<&Path>) -> Self {
        let location = match path {
            Some(p) => {
                let clean_path = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
                clean_path.to_string_lossy().to_string()
            }
            None => "string".to_string(),
        };

        ObserveError::TomlParse {
            location,
            details: error.to_string(),
        }
    }

    /// Creates an I/O error with file path context.
    pub fn io(error: &io::Error, path: &Path) -> Self {
        ObserveError::Io {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }
}
