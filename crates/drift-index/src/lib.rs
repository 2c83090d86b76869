//! Named-artifact index for Drift.
//!
//! The blob store only knows content hashes. This crate keeps the small
//! catalog that maps human-assigned names to those hashes, in two independent
//! namespaces:
//!
//! - **Query** records name a saved artifact by its display text.
//! - **Session** records name a serialized session.
//!
//! Session names are unique; registering a taken one fails with
//! [`IndexError::Conflict`]. Query names repeat whenever the same prompt is
//! generated again, so each save appends a record and lookups by name return
//! the latest one. Unregistering only drops the name -- the blob it pointed
//! at stays in the blob store.
//!
//! # Modules
//!
//! - [`error`] -- Error types for index operations
//! - [`types`] -- [`Namespace`] and [`IndexRecord`]
//! - [`traits`] -- The [`NamedIndex`] trait defining the storage interface
//! - [`names`] -- Name validation
//! - [`memory`] -- In-memory [`InMemoryNamedIndex`] for tests
//! - [`sqlite`] -- Durable [`SqliteNamedIndex`]

pub mod error;
pub mod memory;
pub mod names;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{IndexError, IndexResult};
pub use memory::InMemoryNamedIndex;
pub use names::validate_name;
pub use sqlite::SqliteNamedIndex;
pub use traits::NamedIndex;
pub use types::{IndexRecord, Namespace};
