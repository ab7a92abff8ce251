// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::AdapterError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// A content checksum the driver attaches to an upload. The store never
/// computes this itself — it is handed the digest the driver already has
/// from the remote hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: &'static str,
    pub base64: String,
}

impl Checksum {
    pub fn sha256(digest: &[u8]) -> Self {
        use base64::Engine;
        Self {
            algorithm: "SHA256",
            base64: base64::engine::general_purpose::STANDARD.encode(digest),
        }
    }
}

/// Uploads a file to the configured bucket with tags, metadata, and a
/// precomputed checksum. Upload must be durable before `upload` returns;
/// overwriting the same `remote_key` must be safe to retry.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        tags: &BTreeMap<String, String>,
        metadata: &BTreeMap<String, String>,
        checksum: &Checksum,
    ) -> Result<(), AdapterError>;
}

/// Backed by any store the `object_store` crate supports (S3, GCS, Azure,
/// local disk). Tags and checksum become object metadata entries since
/// `object_store`'s `PutOptions` has no first-class tagging API across all
/// backends; prefixing keeps them distinguishable from caller-supplied
/// metadata.
pub struct ObjectStoreRemote {
    store: std::sync::Arc<dyn object_store::ObjectStore>,
}

impl ObjectStoreRemote {
    pub fn new(store: std::sync::Arc<dyn object_store::ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteStore for ObjectStoreRemote {
    async fn upload(
        &self,
        local_path: &Path,
        remote_key: &str,
        tags: &BTreeMap<String, String>,
        metadata: &BTreeMap<String, String>,
        checksum: &Checksum,
    ) -> Result<(), AdapterError> {
        let bytes = tokio::fs::read(local_path).await?;
        let path = object_store::path::Path::from(remote_key);

        let mut attributes = object_store::Attributes::new();
        for (k, v) in metadata {
            attributes.insert(
                object_store::Attribute::Metadata(format!("meta-{k}").into()),
                v.clone().into(),
            );
        }
        for (k, v) in tags {
            attributes.insert(
                object_store::Attribute::Metadata(format!("tag-{k}").into()),
                v.clone().into(),
            );
        }
        attributes.insert(
            object_store::Attribute::Metadata("checksum-algorithm".into()),
            checksum.algorithm.into(),
        );
        attributes.insert(
            object_store::Attribute::Metadata("checksum-value".into()),
            checksum.base64.clone().into(),
        );

        let opts = object_store::PutOptions::from(attributes);
        self.store
            .put_opts(&path, bytes.into(), opts)
            .await
            .map_err(|e| AdapterError::Remote(e.to_string()))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UploadedObject {
        pub bytes: Vec<u8>,
        pub tags: BTreeMap<String, String>,
        pub metadata: BTreeMap<String, String>,
        pub checksum: Checksum,
    }

    #[derive(Default)]
    pub struct FakeRemoteStore {
        objects: Mutex<BTreeMap<String, UploadedObject>>,
    }

    impl FakeRemoteStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get(&self, remote_key: &str) -> Option<UploadedObject> {
            self.objects.lock().get(remote_key).cloned()
        }

        pub fn key_count(&self) -> usize {
            self.objects.lock().len()
        }

        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemoteStore {
        async fn upload(
            &self,
            local_path: &Path,
            remote_key: &str,
            tags: &BTreeMap<String, String>,
            metadata: &BTreeMap<String, String>,
            checksum: &Checksum,
        ) -> Result<(), AdapterError> {
            let bytes = tokio::fs::read(local_path).await?;
            self.objects.lock().insert(
                remote_key.to_string(),
                UploadedObject {
                    bytes,
                    tags: tags.clone(),
                    metadata: metadata.clone(),
                    checksum: checksum.clone(),
                },
            );
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemoteStore, UploadedObject};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_upload_records_tags_metadata_and_checksum() {
        let store = FakeRemoteStore::new();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file.as_file(), b"payload").unwrap();

        let mut tags = BTreeMap::new();
        tags.insert("backup-type".to_string(), "full".to_string());
        let mut metadata = BTreeMap::new();
        metadata.insert("dataset".to_string(), "pool1".to_string());

        let checksum = Checksum::sha256(&[1, 2, 3]);
        store
            .upload(file.path(), "pool1/full_2026-08-01/part000000.zst.age", &tags, &metadata, &checksum)
            .await
            .unwrap();

        let uploaded = store.get("pool1/full_2026-08-01/part000000.zst.age").unwrap();
        assert_eq!(uploaded.bytes, b"payload");
        assert_eq!(uploaded.tags.get("backup-type"), Some(&"full".to_string()));
        assert_eq!(uploaded.checksum, checksum);
        assert_eq!(store.key_count(), 1);
    }
}
