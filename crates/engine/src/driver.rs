// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::infer::{infer, Inference};
use crate::{lifecycle, PipelineError};
use bkp_adapters::{
    AdapterError, Checksum, Chunker, CompressionCodec, EncryptionCodec, Filesystem, Hasher, RemoteStore, SnapshotProducer,
};
use bkp_core::{chunk_path, task_temp_dir, ChunkPaths, CurrentTask, LatestEntry, StageName};
use bkp_storage::StateStore;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Bundles the State Store and every collaborator the driver depends on.
/// `local_hasher` covers plaintext/compressed-content integrity (stream
/// digest, per-chunk split chain, `compress_hash`); `remote_hasher` covers
/// the encrypted upload payload (`encrypt_hash`, per-object checksum) — the
/// two logical instances §4.B calls for.
pub struct Pipeline<'a> {
    pub store: &'a StateStore,
    pub producer: &'a dyn SnapshotProducer,
    pub chunker: &'a dyn Chunker,
    pub compression: &'a dyn CompressionCodec,
    pub encryption: &'a dyn EncryptionCodec,
    pub remote: &'a dyn RemoteStore,
    pub filesystem: &'a dyn Filesystem,
    pub local_hasher: &'a mut dyn Hasher,
    pub remote_hasher: &'a mut dyn Hasher,
    pub root: PathBuf,
}

impl Pipeline<'_> {
    fn task_dir(&self, task: &CurrentTask) -> PathBuf {
        task_temp_dir(&self.root, &task.dataset, task.backup_type, task.target_date)
    }

    fn chunk_paths(&self, task: &CurrentTask, i: u64) -> ChunkPaths {
        chunk_path(&self.task_dir(task), i, self.compression.extension(), self.encryption.extension())
    }

    /// One iteration of the loop in §4.H: infer, check for error, dispatch,
    /// repeat while `auto`. Returns once the queue empties, a stage errors,
    /// shutdown is observed, or (when `!auto`) after a single step.
    pub async fn run(&mut self, auto: bool) -> Result<(), PipelineError> {
        loop {
            if self.store.load_queue()?.is_empty() {
                return Ok(());
            }
            let mut task = self.store.load_current()?.ok_or_else(|| {
                // Task Lifecycle guarantees a current task exists whenever the
                // queue is non-empty; reaching this means state was tampered
                // with outside the driver.
                PipelineError::ProgrammerError(StageName::SnapshotExport)
            })?;

            let inference = infer(&task);
            if inference.is_error() {
                let err = PipelineError::StateInconsistency {
                    stage: inference.stage,
                    progress: inference.progress,
                    target: inference.target,
                };
                let (stage, progress, target, kind) = err.log_fields();
                tracing::error!(?stage, progress, target, kind, "pipeline stopped");
                return Err(err);
            }

            if let Err(err) = self.dispatch(&mut task, inference).await {
                // A collaborator observing cooperative cancellation surfaces
                // as `AdapterError::Shutdown`; the driver reports that
                // distinctly from a genuine I/O failure.
                return Err(match err {
                    PipelineError::CollaboratorIo(AdapterError::Shutdown) => PipelineError::ShutdownRequested,
                    other => other,
                });
            }

            if !auto {
                return Ok(());
            }
        }
    }

    async fn dispatch(&mut self, task: &mut CurrentTask, inference: Inference) -> Result<(), PipelineError> {
        match inference.stage {
            StageName::SnapshotExport => self.snapshot_export(task).await,
            StageName::SnapshotTest => self.snapshot_test(task).await,
            StageName::SnapshotHash => self.snapshot_hash(task).await,
            StageName::Split => self.split(task).await,
            StageName::Compress => self.compress(task, inference.target as u64).await,
            StageName::CompressTest => self.compress_test(task, inference.target as u64).await,
            StageName::CompressHash => self.compress_hash(task).await,
            StageName::Encrypt => self.encrypt(task, inference.target as u64).await,
            StageName::EncryptTest => self.encrypt_test(task, inference.target as u64).await,
            StageName::EncryptHash => self.encrypt_hash(task).await,
            StageName::Upload => self.upload(task, inference.target as u64).await,
            StageName::Clear => self.clear(task, inference.target as u64).await,
            StageName::Done => self.done(task).await,
        }
    }

    async fn snapshot_export(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        if task.has_missing_reference() {
            return Err(PipelineError::MissingReference { dataset: task.dataset.clone() });
        }

        let dir = self.task_dir(task);
        let ref_snapshot = if task.r#ref.is_empty() { None } else { Some(task.r#ref.as_str()) };
        let produced = self.producer.export(&task.dataset, &task.base, ref_snapshot, &dir).await?;
        let size = self.filesystem.size(&produced).await?;
        let chunk_size = self.chunker.chunk_size();

        task.split_quantity = size.div_ceil(chunk_size) as i64;
        task.stage.snapshot_exported = self.producer.filename().to_string();
        self.store.save_current(task)?;
        Ok(())
    }

    async fn snapshot_test(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        let path = self.task_dir(task).join(&task.stage.snapshot_exported);
        let ok = self.producer.verify(&task.dataset, &path).await?;
        task.stage.snapshot_tested = ok;
        self.store.save_current(task)?;
        if !ok {
            return Err(PipelineError::VerificationFailure { stage: StageName::SnapshotTest });
        }
        Ok(())
    }

    async fn snapshot_hash(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        let path = self.task_dir(task).join(&task.stage.snapshot_exported);
        let digest = self.local_hasher.hash_file(&path).await?;
        task.stage.snapshot_hash = digest.clone();
        task.stream_hash = digest;
        self.store.save_current(task)?;
        Ok(())
    }

    async fn split(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        let i = task.stage.split_count();
        let prev: Vec<u8> = task.stage.last_chain().map(|c| c.to_vec()).unwrap_or_default();
        let stream_path = self.task_dir(task).join(&task.stage.snapshot_exported);
        let out_path = self.chunk_paths(task, i).split;

        let chain = self.chunker.split(&stream_path, i, &prev, &out_path, self.local_hasher).await?;
        task.stage.split.push(chain);
        self.store.save_current(task)?;
        Ok(())
    }

    async fn compress(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        self.compression.compress(&paths.split).await?;
        task.stage.compressed += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    async fn compress_test(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        let ok = self.compression.verify(&paths.compressed).await?;
        if !ok {
            return Err(PipelineError::VerificationFailure { stage: StageName::CompressTest });
        }
        self.filesystem.delete(&paths.split).await?;
        task.stage.compressed_test += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    /// Whole-stream checkpoint over every compressed chunk in order, kept
    /// alongside the per-chunk digests `encrypt` records — not consulted by
    /// `encrypt_test`, which checks chunk `i` against its own digest.
    async fn compress_hash(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        self.local_hasher.reset();
        for i in 0..task.split_quantity as u64 {
            let paths = self.chunk_paths(task, i);
            let bytes = self.filesystem.read(&paths.compressed).await?;
            self.local_hasher.update(&bytes);
        }
        task.stage.compressed_hash = self.local_hasher.finalize();
        self.store.save_current(task)?;
        Ok(())
    }

    /// Hashes the compressed chunk before encrypting it, so `encrypt_test(i)`
    /// has chunk `i`'s own pre-encryption digest to check against.
    async fn encrypt(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        let digest = self.local_hasher.hash_file(&paths.compressed).await?;
        task.stage.encrypt_expected_hash.push(digest);
        self.encryption.encrypt(&paths.compressed).await?;
        task.stage.encrypted += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    /// Verifies chunk `i` against its own pre-encryption digest from
    /// `encrypt_expected_hash[i]`, recorded by `encrypt(i)` immediately
    /// before that chunk was encrypted.
    async fn encrypt_test(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        let expected_hash = task.stage.encrypt_expected_hash[i as usize].clone();
        let ok = self.encryption.verify(&paths.encrypted, &expected_hash, self.local_hasher).await?;
        if !ok {
            return Err(PipelineError::VerificationFailure { stage: StageName::EncryptTest });
        }
        self.filesystem.delete(&paths.compressed).await?;
        task.stage.encrypted_test += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    async fn encrypt_hash(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        self.remote_hasher.reset();
        for i in 0..task.split_quantity as u64 {
            let paths = self.chunk_paths(task, i);
            let bytes = self.filesystem.read(&paths.encrypted).await?;
            self.remote_hasher.update(&bytes);
        }
        task.stage.encrypted_hash = self.remote_hasher.finalize();
        self.store.save_current(task)?;
        Ok(())
    }

    async fn upload(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        let remote_key = paths
            .encrypted
            .strip_prefix(&self.root)
            .unwrap_or(&paths.encrypted)
            .to_string_lossy()
            .replace('\\', "/");

        let digest = self.remote_hasher.hash_file(&paths.encrypted).await?;
        let checksum = Checksum::sha256(&digest);

        let mut tags = BTreeMap::new();
        tags.insert("backup-type".to_string(), task.backup_type.as_str().to_string());

        let mut metadata = BTreeMap::new();
        metadata.insert("dataset".to_string(), task.dataset.clone());
        metadata.insert("base-snapshot".to_string(), task.base.clone());
        metadata.insert("ref-snapshot".to_string(), task.r#ref.clone());

        self.remote.upload(&paths.encrypted, &remote_key, &tags, &metadata, &checksum).await?;
        task.stage.uploaded += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    async fn clear(&mut self, task: &mut CurrentTask, i: u64) -> Result<(), PipelineError> {
        let paths = self.chunk_paths(task, i);
        self.filesystem.delete(&paths.encrypted).await?;
        task.stage.cleared += 1;
        self.store.save_current(task)?;
        Ok(())
    }

    async fn done(&mut self, task: &mut CurrentTask) -> Result<(), PipelineError> {
        let mut latest = self.store.load_latest()?;
        latest.set(&task.dataset, task.backup_type, LatestEntry::new(task.base.clone(), task.target_date));
        self.store.save_latest(&latest)?;
        lifecycle::dequeue(self.store, self.producer).await?;
        Ok(())
    }
}
