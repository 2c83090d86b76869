//! Error types for the document graph.

use drift_types::{ContentHash, TypeError};

use crate::node::NodeId;

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A referenced node is not in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// `add_root` was called on a graph that already has a root.
    #[error("graph already has a root: {0}")]
    RootExists(NodeId),

    /// The root cannot be removed as a subtree; reset the graph instead.
    #[error("refusing to remove the root node {0}")]
    RootRemoval(NodeId),

    /// A child index is not valid for the node.
    #[error("child index {index} out of range for {node} ({len} children)")]
    ChildOutOfRange {
        /// The node whose children were indexed.
        node: NodeId,
        /// The requested index.
        index: usize,
        /// Number of children the node has.
        len: usize,
    },

    /// A persisted tree is structurally invalid or its hashes do not match.
    #[error("corrupt persisted tree: {0}")]
    Corrupt(String),

    /// A persisted node's stored hash disagrees with its artifact bytes.
    #[error("hash mismatch at persisted node {position}: stored {stored}, computed {computed}")]
    HashMismatch {
        /// Pre-order position of the node.
        position: usize,
        /// Hash recorded in the tree.
        stored: ContentHash,
        /// Hash of the rehydrated artifact.
        computed: ContentHash,
    },

    /// An artifact failed to decode.
    #[error(transparent)]
    Artifact(#[from] TypeError),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
