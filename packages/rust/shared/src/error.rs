//! Error types for LeadMatrix.
//!
//! Library crates use [`LeadMatrixError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadMatrix operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadMatrixError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside the extraction call (e.g. geolocation lookup).
    #[error("network error: {0}")]
    Network(String),

    /// Transport or engine failure while calling the generation engine.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty export, invalid coordinates, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// CSV export error.
    #[error("export error: {0}")]
    Export(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadMatrixError>;

impl LeadMatrixError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable cause.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from the generation engine call.
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }
}
