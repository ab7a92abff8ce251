// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::AdapterError;
use async_trait::async_trait;
use std::path::Path;

/// File access the pipeline drives directly, rather than through the
/// snapshot producer or codec adapters (deletes of intermediate chunk
/// files, size probes for chunk math).
#[async_trait]
pub trait Filesystem: Send + Sync + 'static {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, AdapterError>;
    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<(), AdapterError>;
    async fn delete(&self, path: &Path) -> Result<(), AdapterError>;
    async fn exists(&self, path: &Path) -> Result<bool, AdapterError>;
    async fn size(&self, path: &Path) -> Result<u64, AdapterError>;
}

/// Real filesystem, backed by `tokio::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFilesystem;

impl OsFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Filesystem for OsFilesystem {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, AdapterError> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<(), AdapterError> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }

    async fn exists(&self, path: &Path) -> Result<bool, AdapterError> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn size(&self, path: &Path) -> Result<u64, AdapterError> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Default)]
    struct State {
        files: HashMap<PathBuf, Vec<u8>>,
    }

    /// In-memory filesystem for tests. Missing files report `NotFound`, same
    /// as `OsFilesystem`.
    #[derive(Clone, Default)]
    pub struct FakeFilesystem {
        inner: Arc<Mutex<State>>,
    }

    impl FakeFilesystem {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
            self.inner.lock().files.insert(path.into(), bytes.into());
        }

        pub fn contains(&self, path: &Path) -> bool {
            self.inner.lock().files.contains_key(path)
        }

        pub fn file_count(&self) -> usize {
            self.inner.lock().files.len()
        }
    }

    fn not_found(path: &Path) -> AdapterError {
        AdapterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file: {}", path.display()),
        ))
    }

    #[async_trait]
    impl Filesystem for FakeFilesystem {
        async fn read(&self, path: &Path) -> Result<Vec<u8>, AdapterError> {
            self.inner
                .lock()
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| not_found(path))
        }

        async fn save(&self, path: &Path, bytes: &[u8]) -> Result<(), AdapterError> {
            self.inner.lock().files.insert(path.to_path_buf(), bytes.to_vec());
            Ok(())
        }

        async fn delete(&self, path: &Path) -> Result<(), AdapterError> {
            self.inner
                .lock()
                .files
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| not_found(path))
        }

        async fn exists(&self, path: &Path) -> Result<bool, AdapterError> {
            Ok(self.inner.lock().files.contains_key(path))
        }

        async fn size(&self, path: &Path) -> Result<u64, AdapterError> {
            self.inner
                .lock()
                .files
                .get(path)
                .map(|b| b.len() as u64)
                .ok_or_else(|| not_found(path))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFilesystem;
