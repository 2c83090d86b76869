//! Turning backend responses into artifacts.

use tracing::debug;

use drift_types::{Artifact, Candidate};

use crate::backend::{GenerationBackend, GenerationRequest};
use crate::error::{BackendError, BackendResult};

/// Generate a fresh root artifact for a text prompt.
///
/// Every candidate is labelled with the prompt itself, whatever label the
/// backend sent, so lineage suffixes always start from the query text.
pub fn run_query(
    backend: &dyn GenerationBackend,
    text: &str,
    num_candidates: usize,
) -> BackendResult<Artifact> {
    let items = backend.query(text, num_candidates)?;
    debug!(backend = %backend.describe(), returned = items.len(), "query answered");
    relabel(items, text)
}

/// Generation relative to an existing artifact.
pub trait ArtifactExt {
    /// Issue `request` against this artifact and build the resulting one.
    ///
    /// For `Diffuse` and `Upscale`, every returned candidate is labelled with
    /// the source candidate's label plus the request's lineage suffix. A
    /// `Query` ignores the source and behaves like [`run_query`].
    fn apply_request(
        &self,
        backend: &dyn GenerationBackend,
        request: &GenerationRequest,
    ) -> BackendResult<Artifact>;
}

impl ArtifactExt for Artifact {
    fn apply_request(
        &self,
        backend: &dyn GenerationBackend,
        request: &GenerationRequest,
    ) -> BackendResult<Artifact> {
        let (items, source) = match request {
            GenerationRequest::Query {
                text,
                num_candidates,
            } => return run_query(backend, text, *num_candidates),
            GenerationRequest::Diffuse {
                candidate_index,
                skip_rate,
                num_candidates,
            } => {
                let source = self.candidate(*candidate_index)?;
                let items =
                    backend.diffuse(source, *candidate_index, *skip_rate, *num_candidates)?;
                (items, source)
            }
            GenerationRequest::Upscale { candidate_index } => {
                let source = self.candidate(*candidate_index)?;
                (backend.upscale(source, *candidate_index)?, source)
            }
        };

        debug!(
            backend = %backend.describe(),
            %request,
            returned = items.len(),
            "derived candidates"
        );
        let suffix = request.label_suffix().unwrap_or_default();
        relabel(items, &format!("{}{suffix}", source.label))
    }
}

fn relabel(items: Vec<Candidate>, label: &str) -> BackendResult<Artifact> {
    if items.is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    let candidates = items
        .into_iter()
        .map(|c| Candidate {
            label: label.to_string(),
            ..c
        })
        .collect();
    Ok(Artifact::new(candidates)?)
}
