//! The [`NamedIndex`] trait defining the index storage interface.
//!
//! Any backend (in-memory, SQLite) implements this trait to provide the
//! name → content-hash catalog.

use drift_types::ContentHash;

use crate::error::IndexResult;
use crate::types::{IndexRecord, Namespace};

/// Storage backend for named content hashes.
///
/// Implementations must be thread-safe (`Send + Sync`); each call is one
/// atomic insert, lookup, or delete.
pub trait NamedIndex: Send + Sync {
    /// Register `name` → `hash` in `namespace`.
    ///
    /// Session names are unique: a taken name fails with `Conflict` and the
    /// index is left unchanged. Query names may repeat; every call appends a
    /// new record.
    fn register(&self, namespace: Namespace, name: &str, hash: ContentHash)
        -> IndexResult<IndexRecord>;

    /// The most recently registered record under `name`.
    fn record(&self, namespace: Namespace, name: &str) -> IndexResult<Option<IndexRecord>>;

    /// The earliest record binding `name` to exactly `hash`.
    fn record_for(
        &self,
        namespace: Namespace,
        name: &str,
        hash: ContentHash,
    ) -> IndexResult<Option<IndexRecord>> {
        Ok(self
            .list(namespace)?
            .into_iter()
            .find(|r| r.name == name && r.hash == hash))
    }

    /// Drop every record registered under `name`.
    ///
    /// Returns `Ok(false)` (after logging a diagnostic) when the name does
    /// not exist.
    fn unregister(&self, namespace: Namespace, name: &str) -> IndexResult<bool>;

    /// All records of a namespace in registration (id) order.
    fn list(&self, namespace: Namespace) -> IndexResult<Vec<IndexRecord>>;

    /// Resolve a name to the hash of its most recent record.
    fn resolve(&self, namespace: Namespace, name: &str) -> IndexResult<Option<ContentHash>> {
        Ok(self.record(namespace, name)?.map(|r| r.hash))
    }

    /// Record at `position` of [`list`], if any.
    ///
    /// [`list`]: NamedIndex::list
    fn record_at(&self, namespace: Namespace, position: usize) -> IndexResult<Option<IndexRecord>> {
        Ok(self.list(namespace)?.into_iter().nth(position))
    }
}
