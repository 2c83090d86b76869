use std::io::Read;

use drift_types::ContentHash;

use crate::error::StoreResult;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - The key of a blob is the [`ContentHash`] of its full byte stream, so the
///   same bytes always land under the same key.
/// - Writing an existing blob is idempotent.
/// - `get` returns exactly the bytes that were `put`.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Store a payload and return its content hash.
    fn put(&self, data: &[u8]) -> StoreResult<ContentHash>;

    /// Store everything a reader yields, hashing it block by block.
    ///
    /// The default implementation buffers the payload and calls [`put`].
    ///
    /// [`put`]: BlobStore::put
    fn put_reader(&self, reader: &mut dyn Read) -> StoreResult<ContentHash> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.put(&data)
    }

    /// Read a blob. Fails with `NotFound` when no blob exists for `hash`.
    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Check whether a blob exists.
    fn exists(&self, hash: &ContentHash) -> StoreResult<bool>;

    /// Delete a blob. Returns `true` if it existed.
    ///
    /// Maintenance only: nothing tracks which names still reference a blob.
    fn delete(&self, hash: &ContentHash) -> StoreResult<bool>;
}
