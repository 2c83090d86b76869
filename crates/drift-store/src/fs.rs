//! Sharded filesystem blob store.
//!
//! On-disk layout:
//!
//! ```text
//! <root>/
//!   tmp/                      spool area for in-flight writes
//!   0000/ 0001/ ... ffff/     one bucket per hash prefix, created up front
//!     <full 64-char hex hash> one file per blob
//! ```
//!
//! Buckets are created eagerly when an empty (or missing) root is opened, so
//! inserts never check whether their bucket exists. Blobs are spooled into
//! `tmp/` and renamed into place, which makes each single-blob write atomic.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use drift_types::{ContentHash, ContentHasher, BLOCK_SIZE};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

const TMP_DIR: &str = "tmp";
const MAX_PREFIX_LEN: usize = 4;

/// Bucket sharding parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreLayout {
    /// Number of leading hex characters of the hash that select the bucket.
    pub prefix_len: usize,
}

impl StoreLayout {
    /// Number of bucket directories this layout uses (16^prefix_len).
    pub fn bucket_count(&self) -> usize {
        16usize.pow(self.prefix_len as u32)
    }

    /// Every bucket name, in ascending order.
    pub fn bucket_names(&self) -> impl Iterator<Item = String> {
        let width = self.prefix_len;
        (0..self.bucket_count()).map(move |n| format!("{n:0width$x}"))
    }

    fn validate(&self, root: &Path) -> StoreResult<()> {
        if self.prefix_len == 0 || self.prefix_len > MAX_PREFIX_LEN {
            return Err(StoreError::InvalidLayout {
                path: root.to_path_buf(),
                reason: format!(
                    "prefix length must be between 1 and {MAX_PREFIX_LEN}, got {}",
                    self.prefix_len
                ),
            });
        }
        Ok(())
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self { prefix_len: 4 }
    }
}

/// Blob store rooted at a directory on the local filesystem.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    layout: StoreLayout,
}

impl FsBlobStore {
    /// Open (or initialize) a store with the default layout.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(root, StoreLayout::default())
    }

    /// Open (or initialize) a store with an explicit layout.
    ///
    /// A missing or empty root is initialized with every bucket directory.
    /// A non-empty root must already contain the layout's buckets.
    pub fn open_with(root: impl AsRef<Path>, layout: StoreLayout) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        layout.validate(&root)?;

        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidLayout {
                path: root,
                reason: "store root is not a directory".into(),
            });
        }

        let fresh = !root.exists() || fs::read_dir(&root)?.next().is_none();
        let store = Self { root, layout };

        if fresh {
            store.create_buckets()?;
        } else {
            let first = store.root.join("0".repeat(layout.prefix_len));
            if !first.is_dir() {
                return Err(StoreError::InvalidLayout {
                    path: store.root.clone(),
                    reason: format!(
                        "missing bucket {} (expected prefix length {})",
                        first.display(),
                        layout.prefix_len
                    ),
                });
            }
        }
        fs::create_dir_all(store.root.join(TMP_DIR))?;

        Ok(store)
    }

    fn create_buckets(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root)?;
        for bucket in self.layout.bucket_names() {
            fs::create_dir_all(self.root.join(bucket))?;
        }
        info!(
            root = %self.root.display(),
            buckets = self.layout.bucket_count(),
            "initialized blob store"
        );
        Ok(())
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The sharding layout.
    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    /// Path a blob with `hash` is stored at.
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join(hash.prefix(self.layout.prefix_len))
            .join(hash.to_hex())
    }

    fn spool(&self) -> StoreResult<NamedTempFile> {
        Ok(NamedTempFile::new_in(self.root.join(TMP_DIR))?)
    }

    fn commit(&self, hash: ContentHash, file: NamedTempFile) -> StoreResult<ContentHash> {
        let target = self.blob_path(&hash);
        if target.is_file() {
            debug!(hash = %hash.short_hex(), "blob already stored");
            return Ok(hash);
        }
        file.persist(&target).map_err(|e| StoreError::Persist {
            hash,
            source: e.error,
        })?;
        debug!(hash = %hash.short_hex(), "stored blob");
        Ok(hash)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, data: &[u8]) -> StoreResult<ContentHash> {
        let hash = ContentHasher::hash(data);
        if self.blob_path(&hash).is_file() {
            debug!(hash = %hash.short_hex(), "blob already stored");
            return Ok(hash);
        }
        let mut file = self.spool()?;
        file.write_all(data)?;
        file.flush()?;
        self.commit(hash, file)
    }

    fn put_reader(&self, reader: &mut dyn Read) -> StoreResult<ContentHash> {
        let mut file = self.spool()?;
        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; BLOCK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n])?;
        }
        file.flush()?;
        self.commit(hasher.finalize(), file)
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let data = match fs::read(self.blob_path(hash)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*hash));
            }
            Err(e) => return Err(e.into()),
        };
        let computed = ContentHasher::hash(&data);
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed,
            });
        }
        Ok(data)
    }

    fn exists(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.blob_path(hash).is_file())
    }

    fn delete(&self, hash: &ContentHash) -> StoreResult<bool> {
        match fs::remove_file(self.blob_path(hash)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
