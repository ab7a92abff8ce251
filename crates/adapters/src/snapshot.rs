// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::AdapterError;
use async_trait::async_trait;
use bkp_core::BackupType;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Produces a dataset stream to a file and enumerates its snapshots.
///
/// `get_latest`/`set_latest` are part of the narrow collaborator contract,
/// but the canonical `LatestSnapshotIndex` used for reference resolution is
/// the one the state store persists — these exist for producers that track
/// their own pointer as a convenience and are not consulted by the task
/// lifecycle.
#[async_trait]
pub trait SnapshotProducer: Send + Sync + 'static {
    fn filename(&self) -> &str;

    /// Writes a complete stream file under `out_dir` and returns its path.
    /// `ref_snapshot` is `None` for a `full` export.
    async fn export(
        &self,
        dataset: &str,
        base_snapshot: &str,
        ref_snapshot: Option<&str>,
        out_dir: &Path,
    ) -> Result<PathBuf, AdapterError>;

    /// Producer-native consistency check over the exported file.
    async fn verify(&self, dataset: &str, path: &Path) -> Result<bool, AdapterError>;

    /// Snapshot names, newest first.
    async fn list(&self, dataset: &str) -> Result<Vec<String>, AdapterError>;

    async fn get_latest(&self, dataset: &str, backup_type: BackupType) -> Result<Option<String>, AdapterError>;
    async fn set_latest(&self, dataset: &str, backup_type: BackupType, snapshot: &str) -> Result<(), AdapterError>;
}

/// ZFS-backed producer: `zfs send [-i ref] pool@base > out_dir/filename`.
pub struct ZfsSnapshotProducer {
    filename: String,
}

impl ZfsSnapshotProducer {
    pub fn new() -> Self {
        Self {
            filename: "snapshot_".to_string(),
        }
    }
}

impl Default for ZfsSnapshotProducer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotProducer for ZfsSnapshotProducer {
    fn filename(&self) -> &str {
        &self.filename
    }

    async fn export(
        &self,
        dataset: &str,
        base_snapshot: &str,
        ref_snapshot: Option<&str>,
        out_dir: &Path,
    ) -> Result<PathBuf, AdapterError> {
        tokio::fs::create_dir_all(out_dir).await?;
        let out_path = out_dir.join(&self.filename);

        let mut cmd = Command::new("zfs");
        cmd.arg("send").arg(format!("{dataset}@{base_snapshot}"));
        if let Some(r) = ref_snapshot {
            cmd.arg("-i").arg(format!("{dataset}@{r}"));
        }
        cmd.stdout(std::process::Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| AdapterError::Snapshot(format!("spawning zfs send: {e}")))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Snapshot("zfs send produced no stdout pipe".into()))?;

        let mut out_file = tokio::fs::File::create(&out_path).await?;
        tokio::io::copy(&mut stdout, &mut out_file).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| AdapterError::Snapshot(format!("waiting on zfs send: {e}")))?;
        if !status.success() {
            return Err(AdapterError::Snapshot(format!("zfs send exited with {status}")));
        }

        Ok(out_path)
    }

    async fn verify(&self, _dataset: &str, path: &Path) -> Result<bool, AdapterError> {
        Ok(tokio::fs::metadata(path).await.map(|m| m.len() > 0).unwrap_or(false))
    }

    async fn list(&self, dataset: &str) -> Result<Vec<String>, AdapterError> {
        let output = Command::new("zfs")
            .args(["list", "-H", "-o", "name", "-t", "snapshot", dataset])
            .output()
            .await
            .map_err(|e| AdapterError::Snapshot(format!("spawning zfs list: {e}")))?;

        if !output.status.success() {
            return Err(AdapterError::Snapshot(format!(
                "zfs list exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let mut snapshots: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|s| s.to_string())
            .collect();
        snapshots.reverse();
        Ok(snapshots)
    }

    async fn get_latest(&self, _dataset: &str, _backup_type: BackupType) -> Result<Option<String>, AdapterError> {
        Ok(None)
    }

    async fn set_latest(&self, _dataset: &str, _backup_type: BackupType, _snapshot: &str) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ExportCall {
        pub dataset: String,
        pub base_snapshot: String,
        pub ref_snapshot: Option<String>,
    }

    struct State {
        snapshots: Vec<String>,
        export_calls: Vec<ExportCall>,
        shutdown: bool,
        verify_result: bool,
    }

    /// In-memory producer for tests: `export` writes `chunk_count *
    /// bytes_per_chunk` bytes of deterministic filler, so tests can size a
    /// stream precisely without touching real ZFS.
    pub struct FakeSnapshotProducer {
        filename: String,
        bytes_per_chunk: u64,
        chunk_count: u64,
        state: Mutex<State>,
    }

    impl FakeSnapshotProducer {
        pub fn new(snapshots: Vec<String>, chunk_count: u64, bytes_per_chunk: u64) -> Self {
            Self {
                filename: "fake_snapshot_".to_string(),
                bytes_per_chunk,
                chunk_count,
                state: Mutex::new(State {
                    snapshots,
                    export_calls: Vec::new(),
                    shutdown: false,
                    verify_result: true,
                }),
            }
        }

        pub fn set_shutdown(&self, shutdown: bool) {
            self.state.lock().shutdown = shutdown;
        }

        pub fn set_verify_result(&self, result: bool) {
            self.state.lock().verify_result = result;
        }

        pub fn export_calls(&self) -> Vec<ExportCall> {
            self.state.lock().export_calls.clone()
        }
    }

    #[async_trait]
    impl SnapshotProducer for FakeSnapshotProducer {
        fn filename(&self) -> &str {
            &self.filename
        }

        async fn export(
            &self,
            dataset: &str,
            base_snapshot: &str,
            ref_snapshot: Option<&str>,
            out_dir: &Path,
        ) -> Result<PathBuf, AdapterError> {
            if self.state.lock().shutdown {
                return Err(AdapterError::Shutdown);
            }
            self.state.lock().export_calls.push(ExportCall {
                dataset: dataset.to_string(),
                base_snapshot: base_snapshot.to_string(),
                ref_snapshot: ref_snapshot.map(str::to_string),
            });

            tokio::fs::create_dir_all(out_dir).await?;
            let out_path = out_dir.join(&self.filename);
            let total = (self.chunk_count * self.bytes_per_chunk) as usize;
            let mut bytes = Vec::with_capacity(total);
            for i in 0..total {
                bytes.push((i % 251) as u8);
            }
            tokio::fs::write(&out_path, bytes).await?;
            Ok(out_path)
        }

        async fn verify(&self, _dataset: &str, _path: &Path) -> Result<bool, AdapterError> {
            if self.state.lock().shutdown {
                return Err(AdapterError::Shutdown);
            }
            Ok(self.state.lock().verify_result)
        }

        async fn list(&self, _dataset: &str) -> Result<Vec<String>, AdapterError> {
            if self.state.lock().shutdown {
                return Err(AdapterError::Shutdown);
            }
            Ok(self.state.lock().snapshots.clone())
        }

        async fn get_latest(&self, _dataset: &str, _backup_type: BackupType) -> Result<Option<String>, AdapterError> {
            Ok(None)
        }

        async fn set_latest(&self, _dataset: &str, _backup_type: BackupType, _snapshot: &str) -> Result<(), AdapterError> {
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExportCall, FakeSnapshotProducer};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_export_writes_sized_stream_and_records_call() {
        let producer = FakeSnapshotProducer::new(vec!["s2".into(), "s1".into()], 3, 4);
        let dir = tempfile::tempdir().unwrap();
        let path = producer
            .export("pool1", "s2", Some("s1"), dir.path())
            .await
            .unwrap();
        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(
            producer.export_calls(),
            vec![ExportCall {
                dataset: "pool1".into(),
                base_snapshot: "s2".into(),
                ref_snapshot: Some("s1".into()),
            }]
        );
    }

    #[tokio::test]
    async fn fake_export_honors_shutdown() {
        let producer = FakeSnapshotProducer::new(vec![], 1, 4);
        producer.set_shutdown(true);
        let dir = tempfile::tempdir().unwrap();
        let err = producer.export("pool1", "s1", None, dir.path()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Shutdown));
    }
}
