//! Error types for regassist.
//!
//! Library crates use [`RegAssistError`] via `thiserror`.
//! App crates (cli/web) wrap this with `color-eyre` or map it onto HTTP responses.

use std::path::PathBuf;

/// Top-level error type for all regassist operations.
#[derive(Debug, thiserror::Error)]
pub enum RegAssistError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a source page.
    #[error("network error: {0}")]
    Network(String),

    /// A fetched page could not be turned into text.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error. Fatal when it happens while persisting the knowledge base.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// LLM completion error (transport, API status, or response shape).
    #[error("completion error: {0}")]
    Completion(String),

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RegAssistError>;

impl RegAssistError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
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

    /// Whether the error only affects a single source and must not abort a collection run.
    pub fn is_source_local(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Parse { .. })
    }
}
