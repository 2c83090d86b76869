//! Generation backend interface for Drift.
//!
//! The image model itself lives behind a request/response service. This
//! crate defines what Drift asks of it ([`GenerationBackend`]), how those
//! requests travel over TCP ([`BackendMessage`], [`BackendCodec`],
//! [`TcpBackend`]), a deterministic in-process stand-in
//! ([`SyntheticBackend`]), and how a response becomes a new [`Artifact`]
//! with its lineage suffix ([`ArtifactExt::apply_request`]).
//!
//! [`Artifact`]: drift_types::Artifact

pub mod apply;
pub mod backend;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod synthetic;
pub mod tcp;

pub use apply::{run_query, ArtifactExt};
pub use backend::{GenerationBackend, GenerationRequest};
pub use codec::BackendCodec;
pub use endpoint::Endpoint;
pub use error::{BackendError, BackendResult};
pub use message::{BackendMessage, MAX_MESSAGE_SIZE};
pub use synthetic::SyntheticBackend;
pub use tcp::{handle_connection, TcpBackend};
