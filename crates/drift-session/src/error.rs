use thiserror::Error;

use drift_backend::BackendError;
use drift_graph::GraphError;
use drift_index::{IndexError, Namespace};
use drift_store::StoreError;
use drift_types::TypeError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation needs an active document and there is none.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{namespace} name already registered: {name:?}")]
    Conflict { namespace: Namespace, name: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("index error: {0}")]
    Index(IndexError),

    #[error("graph error: {0}")]
    Graph(GraphError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(hash) => Self::NotFound(format!("blob {hash}")),
            other => Self::Store(other),
        }
    }
}

impl From<IndexError> for SessionError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Conflict { namespace, name } => Self::Conflict { namespace, name },
            IndexError::NotFound { namespace, name } => {
                Self::NotFound(format!("{namespace} {name:?}"))
            }
            other => Self::Index(other),
        }
    }
}

impl From<GraphError> for SessionError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::ChildOutOfRange { index, len, .. } => Self::OutOfRange {
                what: "child",
                index,
                len,
            },
            other => Self::Graph(other),
        }
    }
}

impl From<TypeError> for SessionError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::CandidateOutOfRange { index, len } => Self::OutOfRange {
                what: "candidate",
                index,
                len,
            },
            other => Self::Serialization(other.to_string()),
        }
    }
}
