//! A deterministic, in-process backend.
//!
//! [`SyntheticBackend`] fabricates candidate payloads from a seed and the
//! request parameters, so the same request always yields the same bytes.
//! It stands in for the real model in tests and offline use.

use tracing::debug;

use drift_types::{Candidate, ContentHasher};

use crate::backend::GenerationBackend;
use crate::error::BackendResult;

/// Media type of synthetic payloads; they are not real images.
pub const SYNTHETIC_MIME: &str = "application/octet-stream";

const PAYLOAD_LEN: usize = 256;

#[derive(Clone, Debug)]
pub struct SyntheticBackend {
    seed: u64,
}

impl SyntheticBackend {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn payload(&self, op: &str, input: &[u8], params: &[u64], item: usize) -> Vec<u8> {
        let mut hasher = ContentHasher::new();
        hasher
            .update(&self.seed.to_le_bytes())
            .update(op.as_bytes())
            .update(&(input.len() as u64).to_le_bytes())
            .update(input);
        for p in params {
            hasher.update(&p.to_le_bytes());
        }
        hasher.update(&(item as u64).to_le_bytes());
        let digest = hasher.finalize();

        digest
            .as_bytes()
            .iter()
            .copied()
            .cycle()
            .take(PAYLOAD_LEN)
            .enumerate()
            .map(|(i, b)| b ^ (i as u8))
            .collect()
    }

    fn batch(&self, label: &str, op: &str, input: &[u8], params: &[u64], n: usize) -> Vec<Candidate> {
        debug!(seed = self.seed, op, n, "synthesizing candidates");
        (0..n)
            .map(|i| Candidate::new(label, SYNTHETIC_MIME, self.payload(op, input, params, i)))
            .collect()
    }
}

impl GenerationBackend for SyntheticBackend {
    fn describe(&self) -> String {
        format!("synthetic://{}", self.seed)
    }

    fn query(&self, text: &str, num_candidates: usize) -> BackendResult<Vec<Candidate>> {
        Ok(self.batch(text, "query", text.as_bytes(), &[], num_candidates))
    }

    fn diffuse(
        &self,
        source: &Candidate,
        candidate_index: usize,
        skip_rate: f32,
        num_candidates: usize,
    ) -> BackendResult<Vec<Candidate>> {
        let params = [candidate_index as u64, u64::from(skip_rate.to_bits())];
        Ok(self.batch(&source.label, "diffuse", &source.payload, &params, num_candidates))
    }

    fn upscale(&self, source: &Candidate, candidate_index: usize) -> BackendResult<Vec<Candidate>> {
        let params = [candidate_index as u64];
        Ok(self.batch(&source.label, "upscale", &source.payload, &params, 1))
    }
}
