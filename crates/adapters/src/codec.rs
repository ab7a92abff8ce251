// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::{AdapterError, Hasher};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads `path`, writes `path` + `extension`. Never deletes or mutates the
/// input — the driver decides when a chunk file is no longer needed.
#[async_trait]
pub trait CompressionCodec: Send + Sync + 'static {
    fn extension(&self) -> &str;
    async fn compress(&self, path: &Path) -> Result<PathBuf, AdapterError>;
    /// Checks the compressed container's own internal integrity.
    async fn verify(&self, path: &Path) -> Result<bool, AdapterError>;
}

#[async_trait]
pub trait EncryptionCodec: Send + Sync + 'static {
    fn extension(&self) -> &str;
    async fn encrypt(&self, path: &Path) -> Result<PathBuf, AdapterError>;
    /// Decrypts `path` and compares the plaintext's hash (via `hasher`)
    /// against `expected_hash`, the pre-encryption digest recorded by the
    /// driver.
    async fn verify(
        &self,
        path: &Path,
        expected_hash: &[u8],
        hasher: &mut dyn Hasher,
    ) -> Result<bool, AdapterError>;
}

fn appended(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// zstd, the compression the rest of the storage stack already uses.
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl CompressionCodec for ZstdCodec {
    fn extension(&self) -> &str {
        "zst"
    }

    async fn compress(&self, path: &Path) -> Result<PathBuf, AdapterError> {
        let input = tokio::fs::read(path).await?;
        let level = self.level;
        let out_path = appended(path, self.extension());
        let compressed = tokio::task::spawn_blocking(move || zstd::encode_all(input.as_slice(), level))
            .await
            .map_err(|e| AdapterError::Compression(e.to_string()))?
            .map_err(|e| AdapterError::Compression(e.to_string()))?;
        tokio::fs::write(&out_path, compressed).await?;
        Ok(out_path)
    }

    async fn verify(&self, path: &Path) -> Result<bool, AdapterError> {
        let compressed = tokio::fs::read(path).await?;
        let result = tokio::task::spawn_blocking(move || zstd::decode_all(compressed.as_slice()))
            .await
            .map_err(|e| AdapterError::Compression(e.to_string()))?;
        Ok(result.is_ok())
    }
}

/// AES-256-GCM, a 12-byte random nonce prepended to the ciphertext on disk.
/// The nonce is the only per-run randomness in the pipeline; it lives inside
/// file *content*, never in a filename, so idempotent restart naming holds.
pub struct AesGcmCodec {
    key: aes_gcm::Key<aes_gcm::Aes256Gcm>,
}

impl AesGcmCodec {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key: aes_gcm::Key::<aes_gcm::Aes256Gcm>::from_slice(&key).to_owned(),
        }
    }
}

#[async_trait]
impl EncryptionCodec for AesGcmCodec {
    fn extension(&self) -> &str {
        "age"
    }

    async fn encrypt(&self, path: &Path) -> Result<PathBuf, AdapterError> {
        use aes_gcm::aead::{Aead, KeyInit, OsRng};
        use aes_gcm::{AeadCore, Aes256Gcm};

        let plaintext = tokio::fs::read(path).await?;
        let key = self.key;
        let out_path = appended(path, self.extension());

        let payload = tokio::task::spawn_blocking(move || {
            let cipher = Aes256Gcm::new(&key);
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let ciphertext = cipher
                .encrypt(&nonce, plaintext.as_slice())
                .map_err(|e| e.to_string())?;
            let mut out = nonce.to_vec();
            out.extend_from_slice(&ciphertext);
            Ok::<Vec<u8>, String>(out)
        })
        .await
        .map_err(|e| AdapterError::Encryption(e.to_string()))?
        .map_err(AdapterError::Encryption)?;

        tokio::fs::write(&out_path, payload).await?;
        Ok(out_path)
    }

    async fn verify(
        &self,
        path: &Path,
        expected_hash: &[u8],
        hasher: &mut dyn Hasher,
    ) -> Result<bool, AdapterError> {
        use aes_gcm::aead::{Aead, KeyInit};
        use aes_gcm::{Aes256Gcm, Nonce};

        let payload = tokio::fs::read(path).await?;
        if payload.len() < 12 {
            return Ok(false);
        }
        let (nonce_bytes, ciphertext) = payload.split_at(12);
        let nonce_bytes = nonce_bytes.to_vec();
        let key = self.key;
        let ciphertext = ciphertext.to_vec();

        let plaintext = tokio::task::spawn_blocking(move || {
            let cipher = Aes256Gcm::new(&key);
            let nonce = Nonce::from_slice(&nonce_bytes);
            cipher.decrypt(nonce, ciphertext.as_slice())
        })
        .await
        .map_err(|e| AdapterError::Encryption(e.to_string()))?;

        let Ok(plaintext) = plaintext else {
            return Ok(false);
        };

        hasher.reset();
        hasher.update(&plaintext);
        Ok(hasher.finalize() == expected_hash)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Compression fake: "compresses" by copying bytes verbatim with a tag
    /// byte appended, so `verify` can detect corruption by checking the tag.
    pub struct FakeCompressionCodec {
        fail_verify_for: Mutex<Option<PathBuf>>,
    }

    impl FakeCompressionCodec {
        pub fn new() -> Self {
            Self {
                fail_verify_for: Mutex::new(None),
            }
        }

        pub fn fail_verify_for(&self, path: impl Into<PathBuf>) {
            *self.fail_verify_for.lock() = Some(path.into());
        }
    }

    impl Default for FakeCompressionCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    const TAG: u8 = 0xc0;

    #[async_trait]
    impl CompressionCodec for FakeCompressionCodec {
        fn extension(&self) -> &str {
            "zst"
        }

        async fn compress(&self, path: &Path) -> Result<PathBuf, AdapterError> {
            let mut bytes = tokio::fs::read(path).await?;
            bytes.push(TAG);
            let out = appended(path, self.extension());
            tokio::fs::write(&out, bytes).await?;
            Ok(out)
        }

        async fn verify(&self, path: &Path) -> Result<bool, AdapterError> {
            if self.fail_verify_for.lock().as_deref() == Some(path) {
                return Ok(false);
            }
            let bytes = tokio::fs::read(path).await?;
            Ok(bytes.last() == Some(&TAG))
        }
    }

    /// Encryption fake: XORs with a fixed byte, reversible by XOR-ing again.
    pub struct FakeEncryptionCodec {
        fail_verify: Mutex<bool>,
    }

    impl FakeEncryptionCodec {
        pub fn new() -> Self {
            Self {
                fail_verify: Mutex::new(false),
            }
        }

        pub fn fail_next_verify(&self) {
            *self.fail_verify.lock() = true;
        }
    }

    impl Default for FakeEncryptionCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    const XOR_KEY: u8 = 0x5a;

    #[async_trait]
    impl EncryptionCodec for FakeEncryptionCodec {
        fn extension(&self) -> &str {
            "age"
        }

        async fn encrypt(&self, path: &Path) -> Result<PathBuf, AdapterError> {
            let bytes = tokio::fs::read(path).await?;
            let xored: Vec<u8> = bytes.iter().map(|b| b ^ XOR_KEY).collect();
            let out = appended(path, self.extension());
            tokio::fs::write(&out, xored).await?;
            Ok(out)
        }

        async fn verify(
            &self,
            path: &Path,
            expected_hash: &[u8],
            hasher: &mut dyn Hasher,
        ) -> Result<bool, AdapterError> {
            if *self.fail_verify.lock() {
                *self.fail_verify.lock() = false;
                return Ok(false);
            }
            let bytes = tokio::fs::read(path).await?;
            let plaintext: Vec<u8> = bytes.iter().map(|b| b ^ XOR_KEY).collect();
            hasher.reset();
            hasher.update(&plaintext);
            Ok(hasher.finalize() == expected_hash)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCompressionCodec, FakeEncryptionCodec};
