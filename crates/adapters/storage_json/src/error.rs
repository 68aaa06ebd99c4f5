//! Storage-specific error type for the JSON file store.

use std::path::PathBuf;

use smartcode_domain::error::{SmartHomeError, ValidationError};

/// Errors originating from the JSON storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing a collection file failed.
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A collection file is not valid JSON or has the wrong shape.
    #[error("malformed JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record parsed but violates a domain invariant.
    #[error("invalid record #{index} in {path}")]
    InvalidRecord {
        path: PathBuf,
        index: usize,
        #[source]
        source: ValidationError,
    },
}

impl From<StorageError> for SmartHomeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
