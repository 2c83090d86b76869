//! Core index types.

use std::fmt;

use serde::{Deserialize, Serialize};

use drift_types::ContentHash;

/// The two independent name spaces kept by the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// Saved artifacts, named by their display text.
    Query,
    /// Saved sessions, named by the user.
    Session,
}

impl Namespace {
    /// Backing table for this namespace.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Query => "queries",
            Self::Session => "sessions",
        }
    }

    /// Name column for this namespace.
    pub(crate) fn name_column(&self) -> &'static str {
        match self {
            Self::Query => "query_text",
            Self::Session => "session_name",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// One row of the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Auto-incrementing row id; listing order follows it.
    pub id: i64,
    /// Namespace the record lives in.
    pub namespace: Namespace,
    /// Registered name.
    pub name: String,
    /// Hash of the blob the name points at.
    pub hash: ContentHash,
}

impl IndexRecord {
    /// One-line summary: `"{id}:\t{name}"`.
    pub fn summary(&self) -> String {
        format!("{}:\t{}", self.id, self.name)
    }
}
