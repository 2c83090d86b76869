//! Generated artifacts and their candidates.
//!
//! An [`Artifact`] is the result of one generation call. It always holds an
//! ordered, non-empty list of [`Candidate`]s; a single upscaled image is just
//! a one-element batch, so callers never branch on "single vs. batch".
//!
//! # Canonical encoding
//!
//! Artifacts are persisted and hashed through one explicit byte layout:
//!
//! ```text
//! [4 bytes: magic "DRFA"]
//! [4 bytes: candidate count (little-endian u32)]
//! per candidate:
//!   [4 bytes: label length (LE u32)] [label bytes, UTF-8]
//!   [4 bytes: mime length (LE u32)]  [mime bytes, UTF-8]
//!   [8 bytes: payload length (LE u64)] [payload bytes]
//! ```
//!
//! The content hash of an artifact is the hash of exactly these bytes, so the
//! blob store key of a saved artifact equals [`Artifact::hash`].

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;
use crate::hasher::ContentHasher;

const MAGIC: &[u8; 4] = b"DRFA";

/// Operation name recorded in the lineage suffix of diffused artifacts.
pub const DIFFUSE_TAG: &str = "diffuse";
/// Operation name recorded in the lineage suffix of upscaled artifacts.
pub const UPSCALE_TAG: &str = "upscale";

/// One generated image candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display label. Derived candidates carry the lineage suffix trail.
    pub label: String,
    /// Media type of the payload (informational only).
    pub mime: String,
    /// Opaque image bytes.
    pub payload: Vec<u8>,
}

impl Candidate {
    pub fn new(label: impl Into<String>, mime: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            mime: mime.into(),
            payload,
        }
    }

    /// File extension matching the media type, used when exporting.
    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// One generation result: an ordered batch of candidates.
///
/// The content hash is computed lazily and memoized. Once it has been
/// computed the artifact is *sealed*: [`Artifact::tag_lineage`] refuses to
/// touch the labels, so the cached hash can never describe stale bytes.
#[derive(Clone, Debug)]
pub struct Artifact {
    candidates: Vec<Candidate>,
    hash: OnceCell<ContentHash>,
}

impl Artifact {
    /// Build an artifact from a non-empty candidate list.
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, TypeError> {
        if candidates.is_empty() {
            return Err(TypeError::EmptyArtifact);
        }
        Ok(Self {
            candidates,
            hash: OnceCell::new(),
        })
    }

    /// Build a one-candidate artifact.
    pub fn single(candidate: Candidate) -> Self {
        Self {
            candidates: vec![candidate],
            hash: OnceCell::new(),
        }
    }

    /// All candidates in generation order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of candidates (always at least one).
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate at `index`.
    pub fn candidate(&self, index: usize) -> Result<&Candidate, TypeError> {
        self.candidates
            .get(index)
            .ok_or(TypeError::CandidateOutOfRange {
                index,
                len: self.candidates.len(),
            })
    }

    /// Display label of the first (or sole) candidate.
    pub fn text(&self) -> &str {
        self.candidates
            .first()
            .map(|c| c.label.as_str())
            .unwrap_or_default()
    }

    /// Total payload bytes across candidates.
    pub fn payload_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.payload.len() as u64).sum()
    }

    /// Content hash of the canonical encoding, computed once.
    pub fn hash(&self) -> ContentHash {
        *self.hash.get_or_init(|| {
            let mut hasher = ContentHasher::new();
            self.encode_with(|chunk| {
                hasher.update(chunk);
            });
            hasher.finalize()
        })
    }

    /// Returns `true` once the hash has been computed.
    pub fn is_sealed(&self) -> bool {
        self.hash.get().is_some()
    }

    /// Append a lineage suffix to every candidate label.
    pub fn tag_lineage(&mut self, suffix: &str) -> Result<(), TypeError> {
        if self.is_sealed() {
            return Err(TypeError::Sealed);
        }
        for candidate in &mut self.candidates {
            candidate.label.push_str(suffix);
        }
        Ok(())
    }

    /// Canonical byte encoding (see the module docs).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload_bytes() as usize + 64);
        self.encode_with(|chunk| out.extend_from_slice(chunk));
        out
    }

    /// Decode the canonical encoding.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TypeError> {
        let mut cursor = Cursor { data, pos: 0 };
        if cursor.take(4)? != MAGIC {
            return Err(TypeError::Serialization("bad artifact magic".into()));
        }
        let count = cursor.u32()? as usize;
        let mut candidates = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let label = cursor.string()?;
            let mime = cursor.string()?;
            let len = cursor.u64()? as usize;
            let payload = cursor.take(len)?.to_vec();
            candidates.push(Candidate {
                label,
                mime,
                payload,
            });
        }
        if cursor.pos != data.len() {
            return Err(TypeError::Serialization(format!(
                "{} trailing bytes after artifact",
                data.len() - cursor.pos
            )));
        }
        Self::new(candidates)
    }

    fn encode_with(&self, mut sink: impl FnMut(&[u8])) {
        sink(MAGIC);
        sink(&(self.candidates.len() as u32).to_le_bytes());
        for c in &self.candidates {
            sink(&(c.label.len() as u32).to_le_bytes());
            sink(c.label.as_bytes());
            sink(&(c.mime.len() as u32).to_le_bytes());
            sink(c.mime.as_bytes());
            sink(&(c.payload.len() as u64).to_le_bytes());
            sink(&c.payload);
        }
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.candidates == other.candidates
    }
}

impl Eq for Artifact {}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TypeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                TypeError::Serialization(format!(
                    "truncated artifact: need {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, TypeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, TypeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn string(&mut self) -> Result<String, TypeError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// Suffix appended to labels of candidates diffused from `index`.
pub fn diffuse_suffix(index: usize, skip_rate: f32) -> String {
    format!(" -- {DIFFUSE_TAG} item[{index}] sr[{skip_rate}]")
}

/// Suffix appended to labels of candidates upscaled from `index`.
pub fn upscale_suffix(index: usize) -> String {
    format!(" -- {UPSCALE_TAG} item[{index}]")
}

/// Parse the candidate indices recorded in a label's lineage suffix trail.
///
/// Indices are returned in the order they were appended, i.e. root-first.
pub fn lineage_indices(label: &str) -> Vec<usize> {
    let mut indices = Vec::new();
    let mut rest = label;
    while let Some(start) = rest.find("item[") {
        let after = &rest[start + "item[".len()..];
        match after.find(']') {
            Some(end) => {
                if let Ok(index) = after[..end].parse::<usize>() {
                    indices.push(index);
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    indices
}
