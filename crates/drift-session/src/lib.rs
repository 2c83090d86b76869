//! Session navigator for Drift.
//!
//! A [`Session`] holds one growing tree of generated artifacts and a linear
//! navigation stack over it. Queries start a fresh tree; diffuse and upscale
//! branch from the active node and push the new node onto the stack. The
//! stack is a history tape, not a tree view: moving `up` the tree does not
//! move the stack position (see [`Session::is_desynchronized`]).
//!
//! Durable state lives in a [`Catalog`]: artifacts and serialized sessions
//! are blobs in a content-addressed store, and human names point at them
//! through the named index.
//!
//! This is the main entry point for applications embedding Drift.

pub mod catalog;
pub mod config;
pub mod error;
pub mod record;
pub mod render;
pub mod session;
pub mod stack;

pub use catalog::Catalog;
pub use config::{BackendConfig, DriftConfig, GenerationDefaults};
pub use error::{SessionError, SessionResult};
pub use record::{SessionRecord, FORMAT_VERSION};
pub use session::{LoadReport, NavOutcome, PruneOutcome, Session};
pub use stack::NavigationStack;

// Re-export key types
pub use drift_backend::{Endpoint, GenerationBackend, SyntheticBackend, TcpBackend};
pub use drift_graph::{DocumentGraph, GraphNode, NodeId};
pub use drift_index::{IndexRecord, Namespace};
pub use drift_types::{Artifact, Candidate, ContentHash};
