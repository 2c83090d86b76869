//! Foundation types for Drift.
//!
//! Every other Drift crate depends on `drift-types`. It holds the identity
//! and payload types that flow through the store, the index, the document
//! graph, and the session navigator.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- Content-addressed identifier (BLAKE3 digest)
//! - [`ContentHasher`] -- Streaming hasher that ingests payloads in fixed blocks
//! - [`Candidate`] -- One generated image candidate (payload + label)
//! - [`Artifact`] -- One generation result: an ordered batch of candidates

pub mod artifact;
pub mod error;
pub mod hash;
pub mod hasher;

pub use artifact::{
    diffuse_suffix, lineage_indices, upscale_suffix, Artifact, Candidate, DIFFUSE_TAG, UPSCALE_TAG,
};
pub use error::TypeError;
pub use hash::ContentHash;
pub use hasher::{ContentHasher, BLOCK_SIZE};
