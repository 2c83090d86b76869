//! Explicit persisted form of a document graph.
//!
//! A [`PersistedTree`] lists nodes in pre-order. Each entry carries the
//! artifact's canonical bytes, the hash those bytes are expected to have,
//! the positions of its children within the same list, and which of those
//! children is active. Position 0 is
//! the root. Arena ids are not persisted, so the format does not change
//! when the in-memory representation does.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use drift_types::{Artifact, ContentHash};

use crate::error::{GraphError, GraphResult};
use crate::graph::DocumentGraph;
use crate::node::NodeId;

/// One node of a persisted tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNode {
    /// Content hash of `artifact`.
    pub hash: ContentHash,
    /// Canonical artifact encoding (see [`Artifact::to_bytes`]).
    pub artifact: Vec<u8>,
    /// Positions of the children in [`PersistedTree::nodes`], in order.
    pub children: Vec<u32>,
    /// Index into `children` of the active child.
    pub active_child: Option<u32>,
    pub tags: Vec<String>,
}

/// Pre-order list of persisted nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTree {
    pub nodes: Vec<PersistedNode>,
}

impl PersistedTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hash of every node, in pre-order.
    pub fn hashes(&self) -> Vec<ContentHash> {
        self.nodes.iter().map(|n| n.hash).collect()
    }

    /// Serialize to bincode bytes.
    pub fn to_bytes(&self) -> GraphResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// Deserialize from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> GraphResult<Self> {
        bincode::deserialize(data).map_err(|e| GraphError::Serialization(e.to_string()))
    }
}

impl DocumentGraph {
    /// Snapshot the whole graph, root first.
    ///
    /// An empty graph yields an empty tree.
    pub fn to_persisted(&self) -> PersistedTree {
        match self.root() {
            Some(root) => self.snapshot(root),
            None => PersistedTree::default(),
        }
    }

    /// Snapshot the subtree rooted at `start`; `start` becomes position 0.
    pub fn to_persisted_from(&self, start: NodeId) -> GraphResult<PersistedTree> {
        self.get(start)?;
        Ok(self.snapshot(start))
    }

    fn snapshot(&self, start: NodeId) -> PersistedTree {
        let order: Vec<NodeId> = std::iter::once(start)
            .chain(self.descendants(start).unwrap_or_default())
            .collect();
        let positions: HashMap<NodeId, u32> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32))
            .collect();

        let nodes = order
            .iter()
            .filter_map(|id| self.node(*id))
            .map(|node| PersistedNode {
                hash: node.hash(),
                artifact: node.artifact().to_bytes(),
                children: node
                    .children()
                    .iter()
                    .filter_map(|c| positions.get(c).copied())
                    .collect(),
                active_child: node.active_child_index().map(|i| i as u32),
                tags: node.tags.clone(),
            })
            .collect();
        PersistedTree { nodes }
    }

    /// Rebuild a graph from its persisted form.
    ///
    /// Every artifact is decoded and re-hashed; a hash that does not match
    /// the stored one fails the whole load with `HashMismatch`. Structural
    /// problems (a child position that is out of range, points backwards,
    /// or is claimed twice; an active child index past the child list; a
    /// node no parent reaches) fail with `Corrupt`.
    pub fn from_persisted(tree: &PersistedTree) -> GraphResult<Self> {
        let mut graph = DocumentGraph::new();
        let Some(first) = tree.nodes.first() else {
            return Ok(graph);
        };

        let n = tree.nodes.len();
        let mut ids: Vec<Option<NodeId>> = vec![None; n];
        let root = graph.add_root(rehydrate(0, first)?)?;
        graph.tags_mut(root)?.clone_from(&first.tags);
        ids[0] = Some(root);

        for (position, node) in tree.nodes.iter().enumerate() {
            let parent = ids[position].ok_or_else(|| {
                GraphError::Corrupt(format!("node {position} is not reachable from the root"))
            })?;
            for &child in &node.children {
                let child = child as usize;
                if child <= position || child >= n {
                    return Err(GraphError::Corrupt(format!(
                        "node {position} lists invalid child position {child}"
                    )));
                }
                if ids[child].is_some() {
                    return Err(GraphError::Corrupt(format!(
                        "node {child} is listed as a child more than once"
                    )));
                }
                let persisted = &tree.nodes[child];
                let id = graph.add_child(parent, rehydrate(child, persisted)?)?;
                graph.tags_mut(id)?.clone_from(&persisted.tags);
                ids[child] = Some(id);
            }
            if let Some(active) = node.active_child {
                if active as usize >= node.children.len() {
                    return Err(GraphError::Corrupt(format!(
                        "node {position} has active child {active} of {}",
                        node.children.len()
                    )));
                }
                graph.set_active_child(parent, active as usize)?;
            }
        }

        debug!(nodes = graph.len(), "rebuilt graph from persisted tree");
        Ok(graph)
    }
}

fn rehydrate(position: usize, node: &PersistedNode) -> GraphResult<Artifact> {
    let artifact = Artifact::from_bytes(&node.artifact)?;
    let computed = artifact.hash();
    if computed != node.hash {
        return Err(GraphError::HashMismatch {
            position,
            stored: node.hash,
            computed,
        });
    }
    Ok(artifact)
}
