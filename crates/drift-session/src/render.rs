//! Plain-text views of a session and candidate export.
//!
//! These produce strings rather than printing so the shell can colour them
//! and tests can inspect them.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use drift_graph::NodeId;
use drift_types::Artifact;

use crate::error::SessionResult;
use crate::session::Session;

pub const NO_CHILDREN: &str = "No children to display";
pub const EMPTY_GRAPH: &str = "The graph is empty, run a query first";

/// The whole tree, one node per line, indented with `--` per level.
///
/// Nodes on the navigation stack carry their positions, and the active
/// node is marked with `*`.
pub fn render_tree(session: &Session) -> String {
    let graph = session.graph();
    if graph.is_empty() {
        return EMPTY_GRAPH.to_string();
    }

    let mut out = String::new();
    for (depth, node) in graph.walk() {
        if session.active() == Some(node.id()) {
            out.push_str("* ");
        }
        if depth > 0 {
            out.push_str(&vec!["--"; depth].join(" "));
            out.push(' ');
        }
        out.push_str(node.text());
        let positions = stack_positions(session, node.id());
        if !positions.is_empty() {
            out.push_str(&format!(" [stack {}]", positions.join(", ")));
        }
        out.push('\n');
    }
    out
}

fn stack_positions(session: &Session, id: NodeId) -> Vec<String> {
    session
        .stack()
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == id)
        .map(|(i, _)| i.to_string())
        .collect()
}

/// One line per stack entry; the current position is marked with `>`.
pub fn render_stack(session: &Session) -> String {
    let stack = session.stack();
    let mut out = String::new();
    for (i, id) in stack.entries().iter().enumerate() {
        let Some(node) = session.graph().node(*id) else {
            continue;
        };
        let marker = if stack.index() == Some(i) { ">" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {i} {} -- children: [{}]",
            node.text(),
            node.children().len()
        );
    }
    out
}

/// Numbered children of the active node, the active child marked.
pub fn render_children(session: &Session) -> SessionResult<String> {
    let Some(node) = session.active_node() else {
        return Ok(EMPTY_GRAPH.to_string());
    };
    if !node.has_children() {
        return Ok(NO_CHILDREN.to_string());
    }

    let mut out = String::new();
    for (i, child) in node.children().iter().enumerate() {
        let child_node = session.graph().get(*child)?;
        let active = if node.active_child() == Some(*child) {
            " (active)"
        } else {
            ""
        };
        let _ = writeln!(out, "{i} - {}{active}", child_node.text());
    }
    Ok(out)
}

/// The candidate trail from the root to the active node.
pub fn render_lineage(session: &Session) -> SessionResult<String> {
    let mut out = String::new();
    for (step, (id, index)) in session.display_path()?.into_iter().enumerate() {
        let node = session.graph().get(id)?;
        let _ = writeln!(out, "{step} item[{index}] of {}", node.text());
    }
    if let Some(node) = session.active_node() {
        let _ = writeln!(out, "=> {}", node.text());
    }
    Ok(out)
}

/// Write every candidate payload to `dir` as `<hash prefix>-<index>.<ext>`.
pub fn export_candidates(artifact: &Artifact, dir: impl AsRef<Path>) -> SessionResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let prefix = artifact.hash().short_hex();

    let mut paths = Vec::with_capacity(artifact.len());
    for (i, candidate) in artifact.candidates().iter().enumerate() {
        let path = dir.join(format!("{prefix}-{i}.{}", candidate.extension()));
        fs::write(&path, &candidate.payload)?;
        paths.push(path);
    }
    info!(dir = %dir.display(), files = paths.len(), "exported candidates");
    Ok(paths)
}
