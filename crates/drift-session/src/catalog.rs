//! Durable storage for artifacts and sessions.
//!
//! A [`Catalog`] pairs a content-addressed [`BlobStore`] with a
//! [`NamedIndex`]. Blobs hold the bytes; the index maps query labels and
//! session names to blob hashes. A save writes the blob first and registers
//! the name second, so a crash in between leaves an unreferenced blob and
//! never a dangling name.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use drift_index::{IndexRecord, InMemoryNamedIndex, NamedIndex, Namespace, SqliteNamedIndex};
use drift_store::{BlobStore, FsBlobStore, InMemoryBlobStore, StoreError, StoreLayout};
use drift_types::{Artifact, ContentHash};

use crate::config::{DriftConfig, CATALOG_FILE, DATASTORE_DIR};
use crate::error::{SessionError, SessionResult};
use crate::session::Session;

pub struct Catalog {
    blobs: Box<dyn BlobStore>,
    index: Box<dyn NamedIndex>,
}

impl Catalog {
    pub fn new(blobs: impl BlobStore + 'static, index: impl NamedIndex + 'static) -> Self {
        Self {
            blobs: Box::new(blobs),
            index: Box::new(index),
        }
    }

    /// A catalog that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(InMemoryBlobStore::new(), InMemoryNamedIndex::new())
    }

    /// Open (creating if needed) `<workspace>/datastore` and
    /// `<workspace>/catalog.db`.
    pub fn open_workspace(workspace: impl AsRef<Path>, layout: StoreLayout) -> SessionResult<Self> {
        let workspace = workspace.as_ref();
        let blobs = FsBlobStore::open_with(workspace.join(DATASTORE_DIR), layout)?;
        let index = SqliteNamedIndex::open(workspace.join(CATALOG_FILE))?;
        info!(workspace = %workspace.display(), "opened catalog");
        Ok(Self::new(blobs, index))
    }

    pub fn open(config: &DriftConfig) -> SessionResult<Self> {
        Self::open_workspace(&config.workspace, config.store)
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn index(&self) -> &dyn NamedIndex {
        self.index.as_ref()
    }

    // ---- Artifacts ----

    /// Store `artifact` and register it under its display text.
    ///
    /// Saving the same artifact again is a no-op. A different artifact with
    /// an already registered label gets a record of its own, so re-running a
    /// prompt keeps every result.
    pub fn save_artifact(&self, artifact: &Artifact) -> SessionResult<ContentHash> {
        let name = artifact.text();
        let hash = artifact.hash();

        if self.index.record_for(Namespace::Query, name, hash)?.is_some() {
            debug!(name, hash = %hash.short_hex(), "artifact already saved");
            return Ok(hash);
        }

        let stored = self.blobs.put(&artifact.to_bytes())?;
        if stored != hash {
            return Err(StoreError::HashMismatch {
                expected: hash,
                computed: stored,
            }
            .into());
        }
        self.index.register(Namespace::Query, name, hash)?;
        info!(name, hash = %hash.short_hex(), "saved artifact");
        Ok(hash)
    }

    /// Load the artifact stored under `hash`.
    pub fn rebuild_artifact(&self, hash: &ContentHash) -> SessionResult<Artifact> {
        let bytes = self.blobs.get(hash)?;
        Ok(Artifact::from_bytes(&bytes)?)
    }

    pub fn list_queries(&self) -> SessionResult<Vec<IndexRecord>> {
        Ok(self.index.list(Namespace::Query)?)
    }

    /// Hash of the query at `position` in [`list_queries`](Self::list_queries).
    pub fn query_hash_at(&self, position: usize) -> SessionResult<ContentHash> {
        let records = self.list_queries()?;
        records
            .get(position)
            .map(|r| r.hash)
            .ok_or(SessionError::OutOfRange {
                what: "query",
                index: position,
                len: records.len(),
            })
    }

    // ---- Sessions ----

    /// Persist `session` under a new `name`.
    ///
    /// Fails with `Conflict` before anything is written when the name is
    /// already taken.
    pub fn save_session(&self, name: &str, session: &Session) -> SessionResult<ContentHash> {
        if self.index.record(Namespace::Session, name)?.is_some() {
            return Err(SessionError::Conflict {
                namespace: Namespace::Session,
                name: name.to_string(),
            });
        }
        let hash = self.blobs.put(&session.to_bytes()?)?;
        self.index.register(Namespace::Session, name, hash)?;
        info!(name, hash = %hash.short_hex(), "saved session");
        Ok(hash)
    }

    /// Persist `session` under `name`, replacing any previous binding.
    pub fn replace_session(&self, name: &str, session: &Session) -> SessionResult<ContentHash> {
        let hash = self.blobs.put(&session.to_bytes()?)?;
        if self.index.unregister(Namespace::Session, name)? {
            debug!(name, "replacing saved session");
        }
        self.index.register(Namespace::Session, name, hash)?;
        info!(name, hash = %hash.short_hex(), "saved session");
        Ok(hash)
    }

    /// Drop the name of a saved session. The blob stays in the store.
    ///
    /// Returns `false` (after a logged diagnostic) when no such session
    /// exists.
    pub fn remove_session(&self, name: &str) -> SessionResult<bool> {
        Ok(self.index.unregister(Namespace::Session, name)?)
    }

    /// Serialized bytes of the session saved under `name`.
    pub fn session_bytes(&self, name: &str) -> SessionResult<Vec<u8>> {
        let hash = self
            .index
            .resolve(Namespace::Session, name)?
            .ok_or_else(|| SessionError::NotFound(format!("session {name:?}")))?;
        Ok(self.blobs.get(&hash)?)
    }

    pub fn list_sessions(&self) -> SessionResult<Vec<IndexRecord>> {
        Ok(self.index.list(Namespace::Session)?)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_types::Candidate;

    fn artifact(label: &str, seed: u8) -> Artifact {
        Artifact::new(vec![
            Candidate::new(label, "image/png", vec![seed; 8]),
            Candidate::new(label, "image/png", vec![seed, 1]),
        ])
        .unwrap()
    }

    #[test]
    fn saved_artifact_round_trips_by_hash() {
        let catalog = Catalog::in_memory();
        let a = artifact("a glass forest", 1);
        let hash = catalog.save_artifact(&a).unwrap();
        assert_eq!(hash, a.hash());
        assert_eq!(catalog.rebuild_artifact(&hash).unwrap(), a);
        assert_eq!(catalog.query_hash_at(0).unwrap(), hash);
    }

    #[test]
    fn resaving_is_idempotent() {
        let catalog = Catalog::in_memory();
        let a = artifact("a glass forest", 1);
        catalog.save_artifact(&a).unwrap();
        catalog.save_artifact(&a).unwrap();
        assert_eq!(catalog.list_queries().unwrap().len(), 1);
    }

    #[test]
    fn different_artifacts_with_one_label_are_both_kept() {
        let catalog = Catalog::in_memory();
        let first = artifact("a glass forest", 1);
        let second = artifact("a glass forest", 2);
        catalog.save_artifact(&first).unwrap();
        catalog.save_artifact(&second).unwrap();
        catalog.save_artifact(&first).unwrap();

        let records = catalog.list_queries().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.name == "a glass forest"));
        assert_eq!(catalog.rebuild_artifact(&catalog.query_hash_at(0).unwrap()).unwrap(), first);
        assert_eq!(catalog.rebuild_artifact(&catalog.query_hash_at(1).unwrap()).unwrap(), second);
    }

    #[test]
    fn missing_blob_is_not_found() {
        let catalog = Catalog::in_memory();
        assert!(matches!(
            catalog.rebuild_artifact(&ContentHash::of(b"nope")),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            catalog.session_bytes("nope"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn query_position_out_of_range() {
        let catalog = Catalog::in_memory();
        assert!(matches!(
            catalog.query_hash_at(0),
            Err(SessionError::OutOfRange {
                what: "query",
                index: 0,
                len: 0
            })
        ));
    }

    #[test]
    fn workspace_catalog_persists() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout { prefix_len: 1 };
        let a = artifact("tidal", 5);
        {
            let catalog = Catalog::open_workspace(dir.path(), layout).unwrap();
            catalog.save_artifact(&a).unwrap();
        }
        let catalog = Catalog::open_workspace(dir.path(), layout).unwrap();
        let hash = catalog.query_hash_at(0).unwrap();
        assert_eq!(catalog.rebuild_artifact(&hash).unwrap(), a);
        assert!(dir.path().join(DATASTORE_DIR).is_dir());
        assert!(dir.path().join(CATALOG_FILE).is_file());
    }
}
