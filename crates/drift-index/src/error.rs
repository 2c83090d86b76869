//! Error types for index operations.

use thiserror::Error;

use crate::types::Namespace;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The name is already registered in this namespace.
    #[error("{namespace} name already registered: {name}")]
    Conflict { namespace: Namespace, name: String },

    /// The name was not found.
    #[error("{namespace} name not found: {name}")]
    NotFound { namespace: Namespace, name: String },

    /// The name is not acceptable.
    #[error("invalid {namespace} name {name:?}: {reason}")]
    InvalidName {
        namespace: Namespace,
        name: String,
        reason: String,
    },

    /// A stored hash could not be parsed.
    #[error("corrupt record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    /// A lock guarding the index was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Convenience type alias for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;
