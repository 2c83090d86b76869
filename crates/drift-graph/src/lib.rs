//! Document graph for Drift.
//!
//! Every generation result becomes a [`GraphNode`] in a [`DocumentGraph`].
//! A query creates the root; each diffuse or upscale attaches a child to the
//! node that was active at request time, so the graph is always a tree.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Parent and active-child links
//! are ids rather than references, so the structure has no ownership cycles
//! and can be cloned wholesale (see `Session::fork`).
//!
//! [`PersistedTree`] is the explicit on-disk shape of a graph: a pre-order
//! node list with child indices, independent of the arena's ids.

pub mod error;
pub mod graph;
pub mod node;
pub mod persist;

pub use error::{GraphError, GraphResult};
pub use graph::DocumentGraph;
pub use node::{GraphNode, NodeId};
pub use persist::{PersistedNode, PersistedTree};
