//! The interactive navigator over a tree of generated artifacts.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use drift_backend::{run_query, ArtifactExt, GenerationBackend, GenerationRequest};
use drift_graph::{DocumentGraph, GraphNode, NodeId};
use drift_types::{Artifact, ContentHash};

use crate::catalog::Catalog;
use crate::config::{DriftConfig, GenerationDefaults};
use crate::error::{SessionError, SessionResult};
use crate::record::SessionRecord;
use crate::stack::NavigationStack;

/// Result of a navigation step that may legitimately do nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavOutcome {
    /// The active node is now the given one.
    Moved(NodeId),
    /// Nothing changed; the reason has already been logged.
    Unchanged(&'static str),
}

impl NavOutcome {
    pub fn moved(&self) -> Option<NodeId> {
        match self {
            Self::Moved(id) => Some(*id),
            Self::Unchanged(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneOutcome {
    Pruned { nodes: usize, stack_entries: usize },
    Refused(&'static str),
}

/// What a load managed to restore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Stack entries relocated in the rebuilt tree.
    pub resolved: usize,
    /// Recorded stack positions whose hash no node carries.
    pub missing: Vec<(usize, ContentHash)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// One user's working state: the document graph, the navigation stack over
/// it, and the currently active node.
///
/// `active` and the stack position usually agree, but [`up`](Self::up) and
/// [`down`](Self::down) move only `active`. [`is_desynchronized`] reports
/// when they differ; the next stack move brings them back together.
///
/// [`is_desynchronized`]: Self::is_desynchronized
#[derive(Clone)]
pub struct Session {
    graph: DocumentGraph,
    stack: NavigationStack,
    active: Option<NodeId>,
    unsaved: bool,
    backend: Arc<dyn GenerationBackend>,
    catalog: Arc<Catalog>,
    defaults: GenerationDefaults,
}

impl Session {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        catalog: Arc<Catalog>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            graph: DocumentGraph::new(),
            stack: NavigationStack::new(),
            active: None,
            unsaved: false,
            backend,
            catalog,
            defaults,
        }
    }

    /// An empty session wired to the backend and catalog `config` names.
    pub fn from_config(config: &DriftConfig) -> SessionResult<Self> {
        let catalog = Catalog::open(config)?;
        Ok(Self::new(
            config.backend.endpoint.backend(),
            Arc::new(catalog),
            config.backend.defaults(),
        ))
    }

    // ---- Accessors ----

    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn active_node(&self) -> Option<&GraphNode> {
        self.active.and_then(|id| self.graph.node(id))
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn defaults(&self) -> GenerationDefaults {
        self.defaults
    }

    /// True when the active node is not the node at the stack position.
    pub fn is_desynchronized(&self) -> bool {
        self.active.is_some() && self.active != self.stack.current()
    }

    fn require_active(&self) -> SessionResult<NodeId> {
        self.active.ok_or_else(|| {
            SessionError::InvalidState("no document is active, run a query first".into())
        })
    }

    fn warn_if_unsaved(&self, action: &str) {
        if self.unsaved {
            warn!(action, "discarding a session with unsaved changes");
        }
    }

    /// Replace the graph with a single root and point everything at it.
    fn install_root(&mut self, artifact: Artifact) -> SessionResult<NodeId> {
        let mut graph = DocumentGraph::new();
        let root = graph.add_root(artifact)?;
        self.graph = graph;
        self.stack.reset_to(root);
        self.active = Some(root);
        Ok(root)
    }

    // ---- Generation ----

    /// Run a text query and start a fresh tree from its result.
    ///
    /// The old graph is only discarded once the backend has answered.
    pub fn query(&mut self, text: &str) -> SessionResult<NodeId> {
        let artifact = run_query(self.backend.as_ref(), text, self.defaults.query_candidates)?;
        self.warn_if_unsaved("query");
        let root = self.install_root(artifact)?;
        self.unsaved = true;
        info!(node = %root, text, "started new graph from query");
        Ok(root)
    }

    /// Diffuse candidate `index` of the active artifact into a new child.
    pub fn diffuse(&mut self, skip_rate: f32, index: usize) -> SessionResult<NodeId> {
        self.derive(GenerationRequest::Diffuse {
            candidate_index: index,
            skip_rate,
            num_candidates: self.defaults.diffuse_candidates,
        })
    }

    /// Upscale candidate `index` of the active artifact into a new child.
    pub fn upscale(&mut self, index: usize) -> SessionResult<NodeId> {
        self.derive(GenerationRequest::Upscale {
            candidate_index: index,
        })
    }

    fn derive(&mut self, request: GenerationRequest) -> SessionResult<NodeId> {
        let active = self.require_active()?;
        let source = self.graph.get(active)?.artifact();
        if let Some(index) = request.source_index() {
            source.candidate(index)?;
        }
        let artifact = source.apply_request(self.backend.as_ref(), &request)?;

        let id = self.graph.add_child(active, artifact)?;
        let position = self.stack.push(id);
        self.active = Some(id);
        self.unsaved = true;
        debug!(node = %id, parent = %active, position, %request, "derived new document");
        Ok(id)
    }

    // ---- Tree navigation ----

    /// Make the active node's parent active. The stack position stays.
    pub fn up(&mut self) -> SessionResult<NavOutcome> {
        let active = self.require_active()?;
        match self.graph.get(active)?.parent() {
            Some(parent) => {
                self.active = Some(parent);
                debug!(node = %parent, "moved up");
                Ok(NavOutcome::Moved(parent))
            }
            None => Ok(unchanged("already at the root, staying put")),
        }
    }

    /// Select child `child_index` of the active node and make it active.
    pub fn down(&mut self, child_index: usize) -> SessionResult<NavOutcome> {
        let active = self.require_active()?;
        if !self.graph.get(active)?.has_children() {
            return Ok(unchanged("no children, cannot move down"));
        }
        let child = self.graph.set_active_child(active, child_index)?;
        self.active = Some(child);
        debug!(node = %child, "moved down");
        Ok(NavOutcome::Moved(child))
    }

    // ---- Stack navigation ----

    pub fn back(&mut self) -> SessionResult<NavOutcome> {
        self.require_active()?;
        match self.stack.index() {
            None => Ok(unchanged("navigation stack is empty")),
            Some(0) => Ok(unchanged("already at the start of the stack")),
            Some(index) => Ok(self.jump_to(index - 1)),
        }
    }

    pub fn forward(&mut self) -> SessionResult<NavOutcome> {
        self.require_active()?;
        match self.stack.index() {
            None => Ok(unchanged("navigation stack is empty")),
            Some(index) if index + 1 >= self.stack.len() => {
                Ok(unchanged("already at the end of the stack"))
            }
            Some(index) => Ok(self.jump_to(index + 1)),
        }
    }

    /// Toggle between the current and the previously recorded position.
    pub fn prev(&mut self) -> SessionResult<NavOutcome> {
        self.require_active()?;
        match self.stack.swap_previous() {
            Some(id) => {
                self.active = Some(id);
                debug!(node = %id, index = ?self.stack.index(), "toggled to previous position");
                Ok(NavOutcome::Moved(id))
            }
            None => Ok(unchanged("no previous stack position recorded")),
        }
    }

    pub fn set_stack_position(&mut self, position: usize) -> SessionResult<NodeId> {
        let id = self.stack.jump(position).ok_or(SessionError::OutOfRange {
            what: "stack",
            index: position,
            len: self.stack.len(),
        })?;
        self.active = Some(id);
        debug!(node = %id, position, "jumped to stack position");
        Ok(id)
    }

    pub fn goto_root(&mut self) -> SessionResult<NodeId> {
        self.set_stack_position(0)
    }

    fn jump_to(&mut self, position: usize) -> NavOutcome {
        match self.stack.jump(position) {
            Some(id) => {
                self.active = Some(id);
                debug!(node = %id, position, "moved along the stack");
                NavOutcome::Moved(id)
            }
            None => unchanged("stack position vanished"),
        }
    }

    // ---- Structural changes ----

    /// Remove the active node and everything below it.
    ///
    /// Every stack entry whose artifact hash belongs to the removed subtree
    /// is dropped. The parent becomes active and the stack moves to the
    /// parent's position (or the nearest surviving one). The root, and
    /// whatever node anchors the stack at position 0, are never pruned.
    pub fn prune_current_document(&mut self) -> SessionResult<PruneOutcome> {
        let active = self.require_active()?;
        let node = self.graph.get(active)?;
        let Some(parent) = node.parent() else {
            warn!("refusing to prune the root; use reset_graph to drop the whole graph");
            return Ok(PruneOutcome::Refused(
                "cannot prune the root, use reset_graph instead",
            ));
        };
        if self.stack.get(0) == Some(active) {
            warn!("refusing to prune the first stack entry");
            return Ok(PruneOutcome::Refused("cannot prune the first stack entry"));
        }

        let mut doomed: HashSet<ContentHash> =
            self.graph.descendant_hashes(active)?.into_iter().collect();
        doomed.insert(node.hash());
        let label = node.text().to_string();

        let survivors: HashSet<NodeId> = self
            .stack
            .entries()
            .iter()
            .copied()
            .filter(|id| {
                self.graph
                    .node(*id)
                    .is_some_and(|n| !doomed.contains(&n.hash()))
            })
            .collect();

        let removed = self.graph.remove_subtree(active)?;
        let before = self.stack.len();
        self.stack
            .retain_and_refocus(|id| survivors.contains(&id), parent);
        let stack_entries = before - self.stack.len();

        self.active = Some(parent);
        self.unsaved = true;
        info!(
            label,
            nodes = removed.len(),
            stack_entries,
            active = %parent,
            "pruned document"
        );
        Ok(PruneOutcome::Pruned {
            nodes: removed.len(),
            stack_entries,
        })
    }

    /// Drop the graph and the stack.
    pub fn reset_graph(&mut self) {
        self.warn_if_unsaved("reset");
        self.graph = DocumentGraph::new();
        self.stack.clear();
        self.active = None;
        self.unsaved = false;
        debug!("reset graph");
    }

    /// An independent copy sharing only the backend and the catalog.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// The candidate trail from the root to the active node.
    pub fn display_path(&self) -> SessionResult<Vec<(NodeId, usize)>> {
        let active = self.require_active()?;
        Ok(self.graph.lineage(active)?)
    }

    // ---- Documents and the catalog ----

    /// Store the active artifact in the catalog under its label.
    pub fn save_current(&self) -> SessionResult<ContentHash> {
        let active = self.require_active()?;
        self.catalog.save_artifact(self.graph.get(active)?.artifact())
    }

    /// Start a fresh single-node graph from a stored artifact.
    pub fn start_from_doc(&mut self, hash: &ContentHash) -> SessionResult<NodeId> {
        let artifact = self.catalog.rebuild_artifact(hash)?;
        self.warn_if_unsaved("start_from_doc");
        let root = self.install_root(artifact)?;
        self.unsaved = false;
        info!(node = %root, hash = %hash.short_hex(), "started graph from stored document");
        Ok(root)
    }

    /// Start a fresh single-node graph from an artifact held in memory.
    pub fn start_from_artifact(&mut self, artifact: Artifact) -> SessionResult<NodeId> {
        self.warn_if_unsaved("start_from_artifact");
        let root = self.install_root(artifact)?;
        self.unsaved = true;
        debug!(node = %root, "started graph from artifact");
        Ok(root)
    }

    // ---- Persistence ----

    /// Encode the tree rooted at stack[0] and the hash of every stack entry.
    pub fn to_bytes(&self) -> SessionResult<Vec<u8>> {
        let anchor = self
            .stack
            .get(0)
            .or_else(|| self.graph.root())
            .ok_or_else(|| SessionError::InvalidState("session has no documents to save".into()))?;
        let tree = self.graph.to_persisted_from(anchor)?;
        let stack: BTreeMap<usize, ContentHash> = self
            .stack
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(position, id)| self.graph.node(*id).map(|n| (position, n.hash())))
            .collect();
        SessionRecord::new(tree, stack).to_bytes()
    }

    /// Rebuild a session from [`to_bytes`](Self::to_bytes) output.
    ///
    /// Stack entries are relocated by hash in ascending position order; an
    /// entry whose hash matches no node is skipped and listed in the
    /// report. The first relocated entry (or the root, if none) becomes
    /// active.
    pub fn from_bytes(
        bytes: &[u8],
        backend: Arc<dyn GenerationBackend>,
        catalog: Arc<Catalog>,
        defaults: GenerationDefaults,
    ) -> SessionResult<(Self, LoadReport)> {
        let record = SessionRecord::from_bytes(bytes)?;
        let graph = DocumentGraph::from_persisted(&record.tree)?;

        let mut report = LoadReport::default();
        let mut entries = Vec::with_capacity(record.stack.len());
        for (position, hash) in record.stack {
            match graph.find_by_hash(&hash) {
                Some(id) => entries.push(id),
                None => {
                    warn!(position, hash = %hash.short_hex(), "stack entry not found in tree, skipping");
                    report.missing.push((position, hash));
                }
            }
        }
        report.resolved = entries.len();

        let stack = NavigationStack::from_entries(entries);
        let active = stack.current().or_else(|| graph.root());
        let session = Self {
            graph,
            stack,
            active,
            unsaved: false,
            backend,
            catalog,
            defaults,
        };
        debug!(
            nodes = session.graph.len(),
            resolved = report.resolved,
            missing = report.missing.len(),
            "decoded session"
        );
        Ok((session, report))
    }

    /// Save under a new name in the catalog.
    pub fn save_as(&mut self, name: &str) -> SessionResult<ContentHash> {
        let hash = self.catalog.save_session(name, self)?;
        self.unsaved = false;
        Ok(hash)
    }

    /// Save under `name`, replacing whatever was saved there.
    pub fn replace_saved(&mut self, name: &str) -> SessionResult<ContentHash> {
        let hash = self.catalog.replace_session(name, self)?;
        self.unsaved = false;
        Ok(hash)
    }

    /// Load the session saved as `name`.
    pub fn load(
        name: &str,
        backend: Arc<dyn GenerationBackend>,
        catalog: Arc<Catalog>,
        defaults: GenerationDefaults,
    ) -> SessionResult<(Self, LoadReport)> {
        let bytes = catalog.session_bytes(name)?;
        let loaded = Self::from_bytes(&bytes, backend, catalog, defaults)?;
        info!(name, nodes = loaded.0.graph.len(), "loaded session");
        Ok(loaded)
    }
}

fn unchanged(reason: &'static str) -> NavOutcome {
    warn!("{reason}");
    NavOutcome::Unchanged(reason)
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("nodes", &self.graph.len())
            .field("stack", &self.stack)
            .field("active", &self.active)
            .field("unsaved", &self.unsaved)
            .field("backend", &self.backend.describe())
            .finish_non_exhaustive()
    }
}
