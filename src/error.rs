//! Error types for the patch-chain combiner.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Tree root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File changed during scan: {0}")]
    ChangedDuringScan(PathBuf),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors reading or writing the patch sidecar record
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Patch metadata missing: {0}")]
    Missing(PathBuf),

    #[error("Patch metadata malformed in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Unsupported patch metadata version {0}")]
    UnsupportedVersion(u32),

    #[error("Patch metadata I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Combine pipeline errors
///
/// Integrity variants mean the patch cannot be trusted to extend the claimed
/// predecessor; callers should drop the payload rather than retry.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Missing signature: {0}")]
    MissingSignature(String),

    #[error("Previous signatures do not match (expected {expected}, patch declares {declared})")]
    SignatureMismatch { expected: String, declared: String },

    #[error("Unable to extract previous hash from patch metadata")]
    MissingHash,

    #[error("Previous state hash mismatch. Patch previous hash: {declared}, actual: {actual}")]
    HashMismatch { declared: String, actual: String },

    #[error("Merge conflict: {0}")]
    MergeConflict(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CombineError {
    /// True for errors that reject the payload itself rather than the local state.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            CombineError::MissingSignature(_)
                | CombineError::SignatureMismatch { .. }
                | CombineError::MissingHash
                | CombineError::HashMismatch { .. }
                | CombineError::Metadata(MetadataError::Malformed { .. })
                | CombineError::Metadata(MetadataError::UnsupportedVersion(_))
                | CombineError::Metadata(MetadataError::Missing(_))
        )
    }
}

impl From<std::io::Error> for CombineError {
    fn from(err: std::io::Error) -> Self {
        CombineError::Storage(StorageError::IoError(err))
    }
}

/// Application-level errors (configuration, logging, CLI)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Combine failed: {0}")]
    Combine(#[from] CombineError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
