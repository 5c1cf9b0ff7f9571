//! Error types for KvStash
//!
//! Provides a unified error type for all backends.

use thiserror::Error;

/// Result type alias using StashError
pub type Result<T> = std::result::Result<T, StashError>;

/// Unified error type for KvStash operations
#[derive(Debug, Error)]
pub enum StashError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Invalid key {0:?}: cannot be used as a file name")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error for key {key:?}: {source}")]
    KeyIo {
        key: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StashError {
    /// Wrap an I/O error that happened while touching `key`
    pub fn key_io(key: &str, source: std::io::Error) -> Self {
        StashError::KeyIo {
            key: key.to_string(),
            source,
        }
    }

    /// True for the "key absent" outcome of a lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, StashError::KeyNotFound)
    }
}

impl From<bincode::Error> for StashError {
    fn from(err: bincode::Error) -> Self {
        StashError::Serialization(err.to_string())
    }
}
