//! Error types
//!
//! Two levels: `StorageError` for failures of the embedded database and its encoding,
//! `ApiError` for everything the stores, the navigator and the CLI surface.

use crate::types::{BlockId, PageId};
use sled::transaction::TransactionError;
use thiserror::Error;

/// Failures from the persistence layer
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt index entry in {tree}: {key}")]
    CorruptIndex { tree: String, key: String },

    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },
}

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StorageError::Database(e),
        }
    }
}

/// Errors surfaced by the page tree, the document store and navigation
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("No document loaded")]
    NoDocumentLoaded,

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Log a storage failure and lift it into an `ApiError`.
pub(crate) fn logged<T>(operation: &'static str, result: Result<T, StorageError>) -> Result<T, ApiError> {
    result.map_err(|err| {
        tracing::error!(operation, error = %err, "Storage operation failed");
        ApiError::from(err)
    })
}

impl ApiError {
    /// True for the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::PageNotFound(_) | ApiError::BlockNotFound(_))
    }
}
