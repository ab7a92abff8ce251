// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::{AdapterError, Hasher};
use async_trait::async_trait;
use std::path::Path;

/// Splits a produced stream file into fixed-size chunks and threads the hash
/// chain through them.
#[async_trait]
pub trait Chunker: Send + Sync + 'static {
    fn chunk_size(&self) -> u64;

    /// Read bytes `[i*chunk_size, (i+1)*chunk_size)` of `stream_path`, write
    /// them to `out_path` (computed by the caller via
    /// `bkp_core::paths::chunk_path`), and return `H(prev_chain || chunk_i)`.
    async fn split(
        &self,
        stream_path: &Path,
        i: u64,
        prev_chain: &[u8],
        out_path: &Path,
        hasher: &mut dyn Hasher,
    ) -> Result<Vec<u8>, AdapterError>;
}

/// Splits by reading one fixed-size window from the stream file per call.
/// `chunk_size` must be set once at construction; it never changes for a
/// running pipeline instance.
pub struct FixedSizeChunker {
    chunk_size: u64,
}

impl FixedSizeChunker {
    pub fn new(chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk_size must be nonzero");
        Self { chunk_size }
    }
}

#[async_trait]
impl Chunker for FixedSizeChunker {
    fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    async fn split(
        &self,
        stream_path: &Path,
        i: u64,
        prev_chain: &[u8],
        out_path: &Path,
        hasher: &mut dyn Hasher,
    ) -> Result<Vec<u8>, AdapterError> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let mut file = tokio::fs::File::open(stream_path).await?;
        let offset = i * self.chunk_size;
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; self.chunk_size as usize];
        let mut read = 0usize;
        loop {
            let n = file.read(&mut buf[read..]).await?;
            if n == 0 {
                break;
            }
            read += n;
            if read == buf.len() {
                break;
            }
        }
        buf.truncate(read);

        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out_path, &buf).await?;

        hasher.reset();
        hasher.update(prev_chain);
        hasher.update(&buf);
        Ok(hasher.finalize())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Deterministic chunker for tests: "splits" a stream of known length
    /// into `chunk_size`-byte windows purely from byte offsets passed in by
    /// the test, without touching the filesystem.
    pub struct FakeChunker {
        chunk_size: u64,
        shutdown_at: Mutex<Option<u64>>,
    }

    impl FakeChunker {
        pub fn new(chunk_size: u64) -> Self {
            Self {
                chunk_size,
                shutdown_at: Mutex::new(None),
            }
        }

        /// Make `split` return `Shutdown` the next time it is called for
        /// chunk index `i`.
        pub fn shutdown_at_index(&self, i: u64) {
            *self.shutdown_at.lock() = Some(i);
        }
    }

    #[async_trait]
    impl Chunker for FakeChunker {
        fn chunk_size(&self) -> u64 {
            self.chunk_size
        }

        async fn split(
            &self,
            stream_path: &Path,
            i: u64,
            prev_chain: &[u8],
            out_path: &Path,
            hasher: &mut dyn Hasher,
        ) -> Result<Vec<u8>, AdapterError> {
            if *self.shutdown_at.lock() == Some(i) {
                return Err(AdapterError::Shutdown);
            }
            let bytes = tokio::fs::read(stream_path).await.unwrap_or_default();
            let start = (i * self.chunk_size) as usize;
            let end = ((i + 1) * self.chunk_size).min(bytes.len() as u64) as usize;
            let chunk = bytes.get(start..end).unwrap_or_default();

            if let Some(parent) = out_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, chunk).await?;

            hasher.reset();
            hasher.update(prev_chain);
            hasher.update(chunk);
            Ok(hasher.finalize())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChunker;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sha256Hasher;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn split_writes_chunk_file_and_chains_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &vec![1u8; 10]).unwrap();

        let chunker = FixedSizeChunker::new(4);
        let mut hasher = Sha256Hasher::new();

        let out0 = dir.path().join("part000000");
        let out1 = dir.path().join("part000001");
        let out2 = dir.path().join("part000002");

        let c0 = chunker.split(file.path(), 0, &[], &out0, &mut hasher).await.unwrap();
        let c1 = chunker.split(file.path(), 1, &c0, &out1, &mut hasher).await.unwrap();
        let c2 = chunker.split(file.path(), 2, &c1, &out2, &mut hasher).await.unwrap();

        assert_ne!(c0, c1);
        assert_ne!(c1, c2);

        let bytes = tokio::fs::read(&out2).await.unwrap();
        assert_eq!(bytes.len(), 2); // 10 bytes / 4-byte chunks: last chunk is 2 bytes
    }
}
