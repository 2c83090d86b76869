//! Content-addressed blob storage for Drift.
//!
//! Every durable payload in Drift -- saved artifacts and serialized sessions --
//! is stored as an immutable blob keyed by the [`ContentHash`] of its bytes.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`FsBlobStore`] -- sharded directory tree on the local filesystem
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. Writing identical bytes twice is a no-op in effect.
//! 3. One blob is written atomically; a multi-blob save is not transactional.
//! 4. The store never interprets blob contents.
//!
//! [`ContentHash`]: drift_types::ContentHash

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::{FsBlobStore, StoreLayout};
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
