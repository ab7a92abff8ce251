// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::AdapterError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Streaming content hash. The driver keeps two independent instances: one
/// over local plaintext (snapshot stream, compressed chunks), one over the
/// encrypted upload payload.
///
/// `reset` must not reallocate the hasher's internal buffers — callers reuse
/// one instance across many chunks over the lifetime of a task.
#[async_trait]
pub trait Hasher: Send + Sync + 'static {
    fn reset(&mut self);
    fn update(&mut self, bytes: &[u8]);
    fn finalize(&mut self) -> Vec<u8>;

    /// Stream `path` through `update` in bounded-size reads and finalize.
    /// Does not mutate hasher state beyond what `update`/`finalize` already do.
    async fn hash_file(&mut self, path: &Path) -> Result<Vec<u8>, AdapterError> {
        self.reset();
        let bytes = tokio::fs::read(path).await?;
        self.update(&bytes);
        Ok(self.finalize())
    }
}

/// SHA-256, the hash the pipeline uses everywhere strong collision
/// resistance matters (stream digest, chunk digests, remote checksum).
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Hasher for Sha256Hasher {
    fn reset(&mut self) {
        self.inner = Sha256::new();
    }

    fn update(&mut self, bytes: &[u8]) {
        Digest::update(&mut self.inner, bytes);
    }

    fn finalize(&mut self) -> Vec<u8> {
        let digest = std::mem::take(&mut self.inner).finalize();
        digest.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn reset_produces_independent_digests() {
        let mut h = Sha256Hasher::new();
        h.update(b"abc");
        let first = h.finalize();
        h.reset();
        h.update(b"abc");
        let second = h.finalize();
        assert_eq!(first, second);
    }

    #[test]
    fn different_input_yields_different_digest() {
        let mut h = Sha256Hasher::new();
        h.update(b"abc");
        let first = h.finalize();
        h.reset();
        h.update(b"xyz");
        let second = h.finalize();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn hash_file_matches_in_memory_hash() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"chunk contents").unwrap();

        let mut h = Sha256Hasher::new();
        let from_file = h.hash_file(file.path()).await.unwrap();

        h.reset();
        h.update(b"chunk contents");
        let from_memory = h.finalize();

        assert_eq!(from_file, from_memory);
    }
}
