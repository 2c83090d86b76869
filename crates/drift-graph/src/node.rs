//! Graph node types.
//!
//! Each [`GraphNode`] owns exactly one [`Artifact`] and records its place in
//! the tree through ids: `parent` (absent only for the root), the ordered
//! `children` list, and the `active_child` that `down` navigation follows.

use std::fmt;

use drift_types::{Artifact, ContentHash};

/// Arena identifier of a node.
///
/// Ids are allocated monotonically per graph and never reused, so an id
/// held across a prune refers to nothing rather than to a different node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A node in the document graph.
///
/// Structural fields are private; only [`DocumentGraph`] mutates them, which
/// keeps the invariants in one place:
///
/// - the root and only the root has no parent;
/// - `active_child`, when set, is one of `children`;
/// - `children` is in creation order.
///
/// [`DocumentGraph`]: crate::DocumentGraph
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) artifact: Artifact,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) active_child: Option<NodeId>,
    /// Free-form user tags.
    pub tags: Vec<String>,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, artifact: Artifact, parent: Option<NodeId>) -> Self {
        Self {
            id,
            artifact,
            parent,
            children: Vec::new(),
            active_child: None,
            tags: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Content hash of the owned artifact.
    pub fn hash(&self) -> ContentHash {
        self.artifact.hash()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in creation order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn active_child(&self) -> Option<NodeId> {
        self.active_child
    }

    /// Position of the active child within [`children`](Self::children).
    pub fn active_child_index(&self) -> Option<usize> {
        let active = self.active_child?;
        self.children.iter().position(|c| *c == active)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Display label of the owned artifact.
    pub fn text(&self) -> &str {
        self.artifact.text()
    }

    /// One-line summary: label, short hash, child count.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}, {} children)",
            self.text(),
            self.hash().short_hex(),
            self.children.len()
        )
    }
}
