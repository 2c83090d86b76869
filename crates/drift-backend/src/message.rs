use serde::{Deserialize, Serialize};

use drift_types::Candidate;

pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// All message types exchanged with a generation backend.
///
/// The first three are requests, `Candidates` and `Error` are responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BackendMessage {
    Query {
        text: String,
        num_candidates: u32,
    },
    Diffuse {
        source: Candidate,
        candidate_index: u32,
        skip_rate: f32,
        num_candidates: u32,
    },
    Upscale {
        source: Candidate,
        candidate_index: u32,
    },
    Candidates {
        items: Vec<Candidate>,
    },
    Error {
        code: u32,
        message: String,
    },
}

impl BackendMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Query { .. } => 1,
            Self::Diffuse { .. } => 2,
            Self::Upscale { .. } => 3,
            Self::Candidates { .. } => 4,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "Query",
            Self::Diffuse { .. } => "Diffuse",
            Self::Upscale { .. } => "Upscale",
            Self::Candidates { .. } => "Candidates",
            Self::Error { .. } => "Error",
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::Diffuse { .. } | Self::Upscale { .. })
    }
}

/// Error codes carried in [`BackendMessage::Error`].
pub mod codes {
    pub const BAD_REQUEST: u32 = 400;
    pub const GENERATION_FAILED: u32 = 500;
}
