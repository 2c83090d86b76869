//! The persisted form of a session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use drift_graph::PersistedTree;
use drift_types::ContentHash;

use crate::error::{SessionError, SessionResult};

/// Version written into every [`SessionRecord`].
pub const FORMAT_VERSION: u32 = 2;

/// A serialized session: the tree rooted at stack[0] plus the hash of each
/// stack entry by position. Stack entries are relocated by hash on load, so
/// the record never refers to in-memory node ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub format_version: u32,
    pub tree: PersistedTree,
    pub stack: BTreeMap<usize, ContentHash>,
}

impl SessionRecord {
    pub fn new(tree: PersistedTree, stack: BTreeMap<usize, ContentHash>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            tree,
            stack,
        }
    }

    pub fn to_bytes(&self) -> SessionResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> SessionResult<Self> {
        let record: Self = bincode::deserialize(data)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        if record.format_version != FORMAT_VERSION {
            return Err(SessionError::Serialization(format!(
                "unsupported session format version {} (expected {FORMAT_VERSION})",
                record.format_version
            )));
        }
        Ok(record)
    }
}
