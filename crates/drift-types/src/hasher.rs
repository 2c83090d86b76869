use std::io::{self, Read};

use crate::hash::ContentHash;

/// Size of the blocks payloads are fed to the digest in.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Incremental BLAKE3 content hasher.
///
/// Payloads are ingested in [`BLOCK_SIZE`] blocks so that hashing never needs
/// the whole payload in memory. The digest depends only on the bytes, never on
/// how they were split into `update` calls.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
    consumed: u64,
}

impl ContentHasher {
    /// Start a new, empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self.consumed += data.len() as u64;
        self
    }

    /// Number of bytes hashed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Finish the digest.
    pub fn finalize(&self) -> ContentHash {
        ContentHash::from_digest(*self.inner.finalize().as_bytes())
    }

    /// Hash an in-memory payload block by block.
    pub fn hash(data: &[u8]) -> ContentHash {
        let mut hasher = Self::new();
        for block in data.chunks(BLOCK_SIZE) {
            hasher.update(block);
        }
        hasher.finalize()
    }

    /// Hash everything a reader yields, returning the digest and byte count.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(ContentHash, u64)> {
        let mut hasher = Self::new();
        let mut buf = vec![0u8; BLOCK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok((hasher.finalize(), hasher.consumed()))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(data: &[u8], expected: &ContentHash) -> bool {
        Self::hash(data) == *expected
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("consumed", &self.consumed)
            .finish()
    }
}
