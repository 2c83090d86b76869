use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("candidate index {index} out of range (artifact has {len})")]
    CandidateOutOfRange { index: usize, len: usize },

    #[error("an artifact must hold at least one candidate")]
    EmptyArtifact,

    #[error("artifact is sealed: its content hash has already been computed")]
    Sealed,
}
