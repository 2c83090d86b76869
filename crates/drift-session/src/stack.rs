//! The navigation stack: a linear history of visited and created nodes.

use drift_graph::NodeId;

/// Ordered node history with a current position and a one-slot toggle.
///
/// Invariant: `index` is `Some` and in bounds whenever `entries` is
/// non-empty, and `None` when it is empty. `previous`, when set, is in
/// bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationStack {
    entries: Vec<NodeId>,
    index: Option<usize>,
    previous: Option<usize>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack over `entries` positioned at the first one.
    pub fn from_entries(entries: Vec<NodeId>) -> Self {
        let index = if entries.is_empty() { None } else { Some(0) };
        Self {
            entries,
            index,
            previous: None,
        }
    }

    /// Replace everything with a single root entry.
    pub fn reset_to(&mut self, root: NodeId) {
        *self = Self::from_entries(vec![root]);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<NodeId> {
        self.entries.get(position).copied()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Entry at the current position.
    pub fn current(&self) -> Option<NodeId> {
        self.index.and_then(|i| self.get(i))
    }

    /// First position holding `id`.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| *e == id)
    }

    /// Append `id` and make it current; the old position becomes `previous`.
    pub fn push(&mut self, id: NodeId) -> usize {
        self.entries.push(id);
        let position = self.entries.len() - 1;
        self.previous = self.index;
        self.index = Some(position);
        position
    }

    /// Move to `position`, remembering the old one. `None` if out of bounds.
    pub fn jump(&mut self, position: usize) -> Option<NodeId> {
        let id = self.get(position)?;
        self.previous = self.index;
        self.index = Some(position);
        Some(id)
    }

    /// Swap the current and previous positions. `None` if there is no
    /// previous position.
    pub fn swap_previous(&mut self) -> Option<NodeId> {
        let target = self.previous?;
        let id = self.get(target)?;
        self.previous = self.index;
        self.index = Some(target);
        Some(id)
    }

    /// Drop every entry for which `keep` is false.
    ///
    /// The toggle slot is cleared. The current position becomes the first
    /// position of `focus` if it survived, otherwise the old index clamped
    /// to the new length.
    pub fn retain_and_refocus(&mut self, keep: impl Fn(NodeId) -> bool, focus: NodeId) {
        self.entries.retain(|id| keep(*id));
        self.previous = None;
        self.index = match (self.position_of(focus), self.index) {
            _ if self.entries.is_empty() => None,
            (Some(position), _) => Some(position),
            (None, Some(old)) => Some(old.min(self.entries.len() - 1)),
            (None, None) => Some(0),
        };
    }
}
