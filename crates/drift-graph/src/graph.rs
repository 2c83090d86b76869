//! The document graph structure and traversal algorithms.
//!
//! [`DocumentGraph`] stores nodes in a [`HashMap`] keyed by [`NodeId`], with
//! one designated root. All traversals are pre-order: a node, then each of
//! its children's subtrees in creation order.
//!
//! # Invariants
//!
//! - The graph is a tree: exactly one root, every other node has one parent.
//! - Every id in a `children` list resolves to a node whose `parent` points
//!   back.
//! - Node ids are never reused.

use std::collections::HashMap;

use tracing::debug;

use drift_types::{lineage_indices, Artifact, ContentHash};

use crate::error::{GraphError, GraphResult};
use crate::node::{GraphNode, NodeId};

/// An arena-backed tree of generated artifacts.
#[derive(Clone, Debug, Default)]
pub struct DocumentGraph {
    nodes: HashMap<NodeId, GraphNode>,
    root: Option<NodeId>,
    next_id: u64,
}

impl DocumentGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a node, if present.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Look up a node, failing with `NodeNotFound`.
    pub fn get(&self, id: NodeId) -> GraphResult<&GraphNode> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Mutable access to a node's free-form tags.
    pub fn tags_mut(&mut self, id: NodeId) -> GraphResult<&mut Vec<String>> {
        Ok(&mut self.get_mut(id)?.tags)
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Install the root node of an empty graph.
    pub fn add_root(&mut self, artifact: Artifact) -> GraphResult<NodeId> {
        if let Some(root) = self.root {
            return Err(GraphError::RootExists(root));
        }
        let id = self.alloc();
        debug!(node = %id, label = artifact.text(), "added root node");
        self.nodes.insert(id, GraphNode::new(id, artifact, None));
        self.root = Some(id);
        Ok(id)
    }

    /// Append a child to `parent`.
    ///
    /// The parent's active child is only set when this is its first child;
    /// otherwise the existing selection is kept.
    pub fn add_child(&mut self, parent: NodeId, artifact: Artifact) -> GraphResult<NodeId> {
        if !self.contains(parent) {
            return Err(GraphError::NodeNotFound(parent));
        }
        let id = self.alloc();
        debug!(node = %id, %parent, label = artifact.text(), "added child node");
        self.nodes.insert(id, GraphNode::new(id, artifact, Some(parent)));

        let p = self.get_mut(parent)?;
        if p.children.is_empty() {
            p.active_child = Some(id);
        }
        p.children.push(id);
        Ok(id)
    }

    /// Select the `index`-th child of `node` as its active child.
    pub fn set_active_child(&mut self, node: NodeId, index: usize) -> GraphResult<NodeId> {
        let n = self.get_mut(node)?;
        let child = *n.children.get(index).ok_or(GraphError::ChildOutOfRange {
            node,
            index,
            len: n.children.len(),
        })?;
        n.active_child = Some(child);
        Ok(child)
    }

    /// Detach `node` from its parent and drop it with its whole subtree.
    ///
    /// Returns the removed ids in pre-order (`node` first). If the removed
    /// node was the parent's active child, the parent's first remaining
    /// child becomes active, or none when no children remain. The root
    /// cannot be removed this way.
    pub fn remove_subtree(&mut self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        let Some(parent) = self.get(node)?.parent else {
            return Err(GraphError::RootRemoval(node));
        };
        let removed = self.pre_order_from(node);

        let p = self.get_mut(parent)?;
        p.children.retain(|c| *c != node);
        if p.active_child == Some(node) {
            p.active_child = p.children.first().copied();
        }

        for id in &removed {
            self.nodes.remove(id);
        }
        debug!(%node, %parent, removed = removed.len(), "removed subtree");
        Ok(removed)
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    fn pre_order_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                order.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// Every node id in pre-order from the root.
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.root
            .map(|root| self.pre_order_from(root))
            .unwrap_or_default()
    }

    /// Pre-order walk from the root yielding each node with its depth.
    pub fn walk(&self) -> Vec<(usize, &GraphNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, NodeId)> = self.root.map(|r| (0, r)).into_iter().collect();
        while let Some((depth, id)) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push((depth, node));
                stack.extend(node.children.iter().rev().map(|c| (depth + 1, *c)));
            }
        }
        out
    }

    /// All descendants of `node` in pre-order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        self.get(node)?;
        let mut order = self.pre_order_from(node);
        order.remove(0);
        Ok(order)
    }

    /// Artifact hashes of every descendant of `node`, pre-order, excluding
    /// `node` itself.
    pub fn descendant_hashes(&self, node: NodeId) -> GraphResult<Vec<ContentHash>> {
        Ok(self
            .descendants(node)?
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .map(GraphNode::hash)
            .collect())
    }

    /// First node in pre-order whose artifact hash equals `hash`.
    pub fn find_by_hash(&self, hash: &ContentHash) -> Option<NodeId> {
        self.pre_order()
            .into_iter()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.hash() == *hash))
    }

    /// Number of edges between the root and `node`.
    pub fn depth(&self, node: NodeId) -> GraphResult<usize> {
        Ok(self.path_from_root(node)?.len() - 1)
    }

    /// Depth of the deepest node; zero for a lone root or an empty graph.
    pub fn height(&self) -> usize {
        self.walk().into_iter().map(|(d, _)| d).max().unwrap_or(0)
    }

    /// Ids from the root down to `node`, inclusive at both ends.
    pub fn path_from_root(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut path = vec![node];
        let mut current = self.get(node)?.parent;
        while let Some(id) = current {
            path.push(id);
            current = self.get(id)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// The candidate trail that led to `node`, root-first.
    ///
    /// Each pair is an ancestor and the index of the candidate in that
    /// ancestor's artifact from which the next generation step was derived.
    /// The indices come from the lineage suffixes of `node`'s label, matched
    /// against ancestors from the nearest one upward; the trail stops at
    /// whichever runs out first.
    pub fn lineage(&self, node: NodeId) -> GraphResult<Vec<(NodeId, usize)>> {
        let target = self.get(node)?;
        let mut indices = lineage_indices(target.text());
        let mut trail = Vec::new();
        let mut current = target.parent;
        while let (Some(ancestor), Some(index)) = (current, indices.pop()) {
            trail.push((ancestor, index));
            current = self.get(ancestor)?.parent;
        }
        trail.reverse();
        Ok(trail)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use drift_types::{diffuse_suffix, upscale_suffix, Candidate};

    const PROMPT: &str = "a lighthouse at dusk";

    fn artifact(label: &str, seed: u8) -> Artifact {
        let candidates = (0..3u8)
            .map(|i| Candidate::new(label, "image/png", vec![seed, i]))
            .collect();
        Artifact::new(candidates).unwrap()
    }

    /// root
    /// ├── a (diffuse item[0])
    /// │   └── a1 (upscale item[2])
    /// └── b (upscale item[1])
    fn build_tree() -> (DocumentGraph, [NodeId; 4]) {
        let mut g = DocumentGraph::new();
        let root = g.add_root(artifact(PROMPT, 0)).unwrap();
        let a_label = format!("{PROMPT}{}", diffuse_suffix(0, 0.5));
        let a = g.add_child(root, artifact(&a_label, 1)).unwrap();
        let a1_label = format!("{a_label}{}", upscale_suffix(2));
        let a1 = g.add_child(a, artifact(&a1_label, 2)).unwrap();
        let b = g
            .add_child(root, artifact(&format!("{PROMPT}{}", upscale_suffix(1)), 3))
            .unwrap();
        (g, [root, a, a1, b])
    }

    #[test]
    fn empty_graph() {
        let g = DocumentGraph::new();
        assert!(g.is_empty());
        assert_eq!(g.root(), None);
        assert!(g.pre_order().is_empty());
        assert_eq!(g.height(), 0);
    }

    #[test]
    fn second_root_is_rejected() {
        let mut g = DocumentGraph::new();
        let root = g.add_root(artifact(PROMPT, 0)).unwrap();
        assert!(matches!(
            g.add_root(artifact(PROMPT, 1)),
            Err(GraphError::RootExists(r)) if r == root
        ));
    }

    #[test]
    fn root_has_no_parent_children_do() {
        let (g, [root, a, a1, b]) = build_tree();
        assert!(g.get(root).unwrap().is_root());
        assert_eq!(g.get(a).unwrap().parent(), Some(root));
        assert_eq!(g.get(a1).unwrap().parent(), Some(a));
        assert_eq!(g.get(b).unwrap().parent(), Some(root));
        assert_eq!(g.get(root).unwrap().children(), &[a, b]);
    }

    #[test]
    fn first_child_becomes_active_and_stays() {
        let (g, [root, a, _, _]) = build_tree();
        assert_eq!(g.get(root).unwrap().active_child(), Some(a));
    }

    #[test]
    fn set_active_child_validates_index() {
        let (mut g, [root, _, _, b]) = build_tree();
        assert_eq!(g.set_active_child(root, 1).unwrap(), b);
        assert_eq!(g.get(root).unwrap().active_child_index(), Some(1));
        assert!(matches!(
            g.set_active_child(root, 2),
            Err(GraphError::ChildOutOfRange { index: 2, len: 2, .. })
        ));
        assert_eq!(g.get(root).unwrap().active_child(), Some(b));
    }

    #[test]
    fn add_child_to_missing_parent_fails() {
        let (mut g, [_, _, a1, _]) = build_tree();
        g.remove_subtree(a1).unwrap();
        assert!(matches!(
            g.add_child(a1, artifact("orphan", 9)),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn descendants_are_pre_order_and_exclude_self() {
        let (g, [root, a, a1, b]) = build_tree();
        assert_eq!(g.descendants(root).unwrap(), vec![a, a1, b]);
        assert_eq!(g.descendants(a).unwrap(), vec![a1]);
        assert!(g.descendants(b).unwrap().is_empty());

        let hashes = g.descendant_hashes(root).unwrap();
        let expected: Vec<ContentHash> =
            [a, a1, b].iter().map(|id| g.get(*id).unwrap().hash()).collect();
        assert_eq!(hashes, expected);
    }

    #[test]
    fn walk_reports_depths() {
        let (g, [root, a, a1, b]) = build_tree();
        let walked: Vec<(usize, NodeId)> = g.walk().into_iter().map(|(d, n)| (d, n.id())).collect();
        assert_eq!(walked, vec![(0, root), (1, a), (2, a1), (1, b)]);
    }

    #[test]
    fn remove_subtree_drops_node_and_descendants() {
        let (mut g, [root, a, a1, b]) = build_tree();
        let removed = g.remove_subtree(a).unwrap();
        assert_eq!(removed, vec![a, a1]);
        assert_eq!(g.len(), 2);
        assert!(!g.contains(a1));
        assert_eq!(g.get(root).unwrap().children(), &[b]);
        assert_eq!(g.get(root).unwrap().active_child(), Some(b));
    }

    #[test]
    fn remove_last_child_clears_active() {
        let (mut g, [_, a, a1, _]) = build_tree();
        g.remove_subtree(a1).unwrap();
        let parent = g.get(a).unwrap();
        assert!(!parent.has_children());
        assert_eq!(parent.active_child(), None);
    }

    #[test]
    fn remove_inactive_child_keeps_selection() {
        let (mut g, [root, a, _, b]) = build_tree();
        g.remove_subtree(b).unwrap();
        assert_eq!(g.get(root).unwrap().active_child(), Some(a));
    }

    #[test]
    fn root_cannot_be_removed() {
        let (mut g, [root, ..]) = build_tree();
        assert!(matches!(g.remove_subtree(root), Err(GraphError::RootRemoval(_))));
        assert_eq!(g.len(), 4);
    }

    #[test]
    fn find_by_hash_returns_first_pre_order_match() {
        let (mut g, [root, _, a1, _]) = build_tree();
        let target = g.get(a1).unwrap().hash();
        assert_eq!(g.find_by_hash(&target), Some(a1));

        // A duplicate of a1's artifact placed later in pre-order is not picked.
        let dup = g.get(a1).unwrap().artifact().clone();
        let later = g.add_child(root, dup).unwrap();
        assert_ne!(later, a1);
        assert_eq!(g.find_by_hash(&target), Some(a1));
        assert_eq!(g.find_by_hash(&ContentHash::of(b"nothing")), None);
    }

    #[test]
    fn depth_height_and_path() {
        let (g, [root, a, a1, b]) = build_tree();
        assert_eq!(g.depth(root).unwrap(), 0);
        assert_eq!(g.depth(a1).unwrap(), 2);
        assert_eq!(g.depth(b).unwrap(), 1);
        assert_eq!(g.height(), 2);
        assert_eq!(g.path_from_root(a1).unwrap(), vec![root, a, a1]);
    }

    #[test]
    fn lineage_follows_label_suffixes() {
        let (g, [root, a, a1, b]) = build_tree();
        assert_eq!(g.lineage(a1).unwrap(), vec![(root, 0), (a, 2)]);
        assert_eq!(g.lineage(b).unwrap(), vec![(root, 1)]);
        assert!(g.lineage(root).unwrap().is_empty());
    }

    #[test]
    fn lineage_stops_at_the_root() {
        // A rehydrated root can carry suffixes from an earlier session.
        let mut g = DocumentGraph::new();
        let root_label = format!("{PROMPT}{}", upscale_suffix(4));
        let root = g.add_root(artifact(&root_label, 0)).unwrap();
        let child_label = format!("{root_label}{}", upscale_suffix(1));
        let child = g.add_child(root, artifact(&child_label, 1)).unwrap();
        assert_eq!(g.lineage(child).unwrap(), vec![(root, 1)]);
    }

    #[test]
    fn tags_are_mutable() {
        let (mut g, [_, a, ..]) = build_tree();
        g.tags_mut(a).unwrap().push("keeper".into());
        assert_eq!(g.get(a).unwrap().tags, vec!["keeper".to_string()]);
    }

    proptest! {
        #[test]
        fn chain_of_n_has_depth_n(n in 0usize..24) {
            let mut g = DocumentGraph::new();
            let root = g.add_root(artifact(PROMPT, 0)).unwrap();
            let mut tip = root;
            for i in 0..n {
                tip = g.add_child(tip, artifact(PROMPT, i as u8 + 1)).unwrap();
            }
            prop_assert_eq!(g.len(), n + 1);
            prop_assert_eq!(g.height(), n);
            prop_assert_eq!(g.depth(tip).unwrap(), n);
            let hashes = g.descendant_hashes(root).unwrap();
            prop_assert_eq!(hashes.len(), n);
            let unique: HashSet<_> = hashes.into_iter().collect();
            prop_assert_eq!(unique.len(), n);
        }
    }
}
