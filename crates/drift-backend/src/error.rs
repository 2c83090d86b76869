use thiserror::Error;

use drift_types::TypeError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    Framing(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("backend error: code={code}, message={message}")]
    Remote { code: u32, message: String },

    #[error("unexpected {0} message from backend")]
    UnexpectedResponse(&'static str),

    #[error("backend returned no candidates")]
    EmptyResponse,

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error(transparent)]
    Artifact(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;
