use std::path::PathBuf;

use drift_types::ContentHash;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No blob exists for the requested hash.
    #[error("blob not found: {0}")]
    NotFound(ContentHash),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {expected}: stored bytes hash to {computed}")]
    HashMismatch {
        expected: ContentHash,
        computed: ContentHash,
    },

    /// The store root exists but does not look like a blob store.
    #[error("invalid store layout at {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A temp file could not be moved into its bucket.
    #[error("failed to persist blob {hash}: {source}")]
    Persist {
        hash: ContentHash,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
