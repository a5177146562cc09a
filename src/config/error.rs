//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {var}='{value}' as a number")]
    ParseError { var: &'static str, value: String },

    /// A parsed value violates a basic invariant.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },
}
