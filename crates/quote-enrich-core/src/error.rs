//! Collection-level error taxonomy.
//!
//! Per-item annotation failures are not represented here; they are
//! [`AnnotateError`](crate::annotate::AnnotateError)s and never escape a
//! single quote.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    /// Missing credential or invalid setting. Raised before any mutation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The dataset is not in the state the requested stage needs.
    #[error("{message}\n  hint: {hint}")]
    Precondition { message: String, hint: String },

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset at {} is not a JSON array of quotes: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("dataset is locked by another run ({}); remove the lock file if no run is active", path.display())]
    Locked { path: PathBuf },

    #[error("not found: {0}")]
    NotFound(String),
}

impl EnrichError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn precondition(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
            hint: hint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
