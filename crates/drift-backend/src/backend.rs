//! The [`GenerationBackend`] trait and the requests a session issues.

use std::fmt;

use drift_types::{diffuse_suffix, upscale_suffix, Candidate};

use crate::error::BackendResult;

/// A request for new candidates.
///
/// `Diffuse` and `Upscale` are relative to a source artifact: the candidate
/// at `candidate_index` is what the backend works from.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationRequest {
    Query {
        text: String,
        num_candidates: usize,
    },
    Diffuse {
        candidate_index: usize,
        skip_rate: f32,
        num_candidates: usize,
    },
    Upscale {
        candidate_index: usize,
    },
}

impl GenerationRequest {
    /// Operation name, as used in logs and lineage suffixes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Diffuse { .. } => drift_types::DIFFUSE_TAG,
            Self::Upscale { .. } => drift_types::UPSCALE_TAG,
        }
    }

    /// Candidate of the source artifact this request derives from.
    pub fn source_index(&self) -> Option<usize> {
        match self {
            Self::Query { .. } => None,
            Self::Diffuse { candidate_index, .. } | Self::Upscale { candidate_index } => {
                Some(*candidate_index)
            }
        }
    }

    /// Suffix appended to the source label of every derived candidate.
    pub fn label_suffix(&self) -> Option<String> {
        match self {
            Self::Query { .. } => None,
            Self::Diffuse {
                candidate_index,
                skip_rate,
                ..
            } => Some(diffuse_suffix(*candidate_index, *skip_rate)),
            Self::Upscale { candidate_index } => Some(upscale_suffix(*candidate_index)),
        }
    }
}

impl fmt::Display for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query {
                text,
                num_candidates,
            } => write!(f, "query {text:?} x{num_candidates}"),
            Self::Diffuse {
                candidate_index,
                skip_rate,
                num_candidates,
            } => write!(
                f,
                "diffuse item[{candidate_index}] sr[{skip_rate}] x{num_candidates}"
            ),
            Self::Upscale { candidate_index } => write!(f, "upscale item[{candidate_index}]"),
        }
    }
}

/// A service that produces image candidates.
///
/// Calls block until the backend answers. Failures propagate unmodified;
/// there are no retries or timeouts at this level.
pub trait GenerationBackend: Send + Sync {
    /// Human-readable identification, e.g. the endpoint.
    fn describe(&self) -> String;

    /// Generate `num_candidates` candidates for a text prompt.
    fn query(&self, text: &str, num_candidates: usize) -> BackendResult<Vec<Candidate>>;

    /// Generate `num_candidates` variations of `source`.
    fn diffuse(
        &self,
        source: &Candidate,
        candidate_index: usize,
        skip_rate: f32,
        num_candidates: usize,
    ) -> BackendResult<Vec<Candidate>>;

    /// Produce a higher-resolution version of `source`.
    fn upscale(&self, source: &Candidate, candidate_index: usize) -> BackendResult<Vec<Candidate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_follow_request_kind() {
        let q = GenerationRequest::Query {
            text: "owl".into(),
            num_candidates: 4,
        };
        assert_eq!(q.kind(), "query");
        assert_eq!(q.label_suffix(), None);
        assert_eq!(q.source_index(), None);

        let d = GenerationRequest::Diffuse {
            candidate_index: 2,
            skip_rate: 0.5,
            num_candidates: 10,
        };
        assert_eq!(d.kind(), "diffuse");
        assert_eq!(d.label_suffix().unwrap(), " -- diffuse item[2] sr[0.5]");
        assert_eq!(d.source_index(), Some(2));

        let u = GenerationRequest::Upscale { candidate_index: 7 };
        assert_eq!(u.label_suffix().unwrap(), " -- upscale item[7]");
        assert_eq!(u.to_string(), "upscale item[7]");
    }
}
