// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

//! Workspace-level integration tests: scenarios that span `bkp-core`,
//! `bkp-adapters`, `bkp-storage`, and `bkp-engine` together, the way a real
//! `bkpd` invocation would. Per-collaborator and per-stage behavior is
//! covered by each crate's own unit tests; these exercise the seams between
//! crates instead.

use bkp_adapters::{FakeCompressionCodec, FakeEncryptionCodec, FakeRemoteStore, FakeSnapshotProducer, FixedSizeChunker, OsFilesystem, Sha256Hasher};
use bkp_core::test_support::date;
use bkp_core::{BackupTarget, BackupType};
use bkp_engine::lifecycle::{dequeue, enqueue};
use bkp_engine::{Pipeline, PipelineError};
use bkp_storage::StateStore;
use std::path::PathBuf;

const CHUNK_SIZE: u64 = 4;

/// Everything a `bkpd` invocation constructs fresh on every run; rebuilt
/// between steps in the crash-resumption test below to stand in for a
/// process restart — a genuinely new `Sha256Hasher`, new codec instances,
/// the lot, with only the on-disk state and temp files surviving.
struct Collaborators {
    producer: FakeSnapshotProducer,
    chunker: FixedSizeChunker,
    compression: FakeCompressionCodec,
    encryption: FakeEncryptionCodec,
    remote: FakeRemoteStore,
    filesystem: OsFilesystem,
    local_hasher: Sha256Hasher,
    remote_hasher: Sha256Hasher,
}

impl Collaborators {
    fn fresh(snapshots: Vec<&str>, chunk_count: u64) -> Self {
        Self {
            producer: FakeSnapshotProducer::new(snapshots.into_iter().map(str::to_string).collect(), chunk_count, CHUNK_SIZE),
            chunker: FixedSizeChunker::new(CHUNK_SIZE),
            compression: FakeCompressionCodec::new(),
            encryption: FakeEncryptionCodec::new(),
            remote: FakeRemoteStore::new(),
            filesystem: OsFilesystem::new(),
            local_hasher: Sha256Hasher::new(),
            remote_hasher: Sha256Hasher::new(),
        }
    }

    fn pipeline<'a>(&'a mut self, store: &'a StateStore, root: PathBuf) -> Pipeline<'a> {
        Pipeline {
            store,
            producer: &self.producer,
            chunker: &self.chunker,
            compression: &self.compression,
            encryption: &self.encryption,
            remote: &self.remote,
            filesystem: &self.filesystem,
            local_hasher: &mut self.local_hasher,
            remote_hasher: &mut self.remote_hasher,
            root,
        }
    }
}

/// A single-chunk task stopped after `split` and resumed from a rebuilt
/// collaborator set reads its persisted stage straight through to `done`
/// without repeating the finished steps — `infer` reconstructing where the
/// task stands from what's already on disk, not from in-memory state that
/// a real restart would never carry forward.
#[tokio::test]
async fn crash_after_split_resumes_to_completion_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    let root = dir.path().join("temp");
    let store = StateStore::new(&state_dir);

    {
        let mut collaborators = Collaborators::fresh(vec!["s1"], 1);
        enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
            .await
            .unwrap();

        let mut pipeline = collaborators.pipeline(&store, root.clone());
        pipeline.run(false).await.unwrap(); // snapshot_export
        pipeline.run(false).await.unwrap(); // snapshot_test
        pipeline.run(false).await.unwrap(); // snapshot_hash
        pipeline.run(false).await.unwrap(); // split(0)

        let current = store.load_current().unwrap().unwrap();
        assert_eq!(current.stage.split_count(), 1);
        assert_eq!(current.stage.compressed, 0);
    }

    // Simulate the process exiting and a fresh `bkpd run` starting: new
    // collaborators, same on-disk state and chunk files.
    let mut collaborators = Collaborators::fresh(vec!["s1"], 1);
    let mut pipeline = collaborators.pipeline(&store, root.clone());
    pipeline.run(true).await.unwrap();

    assert!(store.load_current().unwrap().is_none());
    assert!(store.load_queue().unwrap().is_empty());
    assert_eq!(
        store.load_latest().unwrap().get("pool1", BackupType::Full).unwrap().snapshot,
        "s1"
    );
}

/// Two targets enqueued back to back drain in FIFO order, and the second
/// target's `base`/`ref` resolution only happens once it reaches the head —
/// `initialize_head` runs lazily per `dequeue`, not eagerly for the whole
/// queue at enqueue time.
#[tokio::test]
async fn two_queued_targets_drain_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state"));
    let root = dir.path().join("temp");

    let mut collaborators = Collaborators::fresh(vec!["s1"], 1);
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool2", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();

    assert_eq!(store.load_queue().unwrap().len(), 2);
    assert_eq!(store.load_current().unwrap().unwrap().dataset, "pool1");

    let mut pipeline = collaborators.pipeline(&store, root);
    pipeline.run(true).await.unwrap();

    assert!(store.load_queue().unwrap().is_empty());
    assert!(store.load_current().unwrap().is_none());
    let latest = store.load_latest().unwrap();
    assert_eq!(latest.get("pool1", BackupType::Full).unwrap().snapshot, "s1");
    assert_eq!(latest.get("pool2", BackupType::Full).unwrap().snapshot, "s1");
    assert_eq!(collaborators.remote.key_count(), 2);
}

/// A `full` backup followed by a `diff` against the same dataset: the
/// second target resolves its reference from the `LatestSnapshotIndex`
/// entry the first backup's `done` stage wrote (`diff` resolves against the
/// latest `full`, not the other way around), end to end through the driver
/// rather than by constructing the index by hand.
#[tokio::test]
async fn diff_chains_off_a_prior_full_backup() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state"));
    let root = dir.path().join("temp");

    let mut collaborators = Collaborators::fresh(vec!["s_full"], 1);
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();
    collaborators.pipeline(&store, root.clone()).run(true).await.unwrap();

    assert_eq!(store.load_latest().unwrap().get("pool1", BackupType::Full).unwrap().snapshot, "s_full");

    let mut collaborators = Collaborators::fresh(vec!["s_diff"], 1);
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Diff, date(2026, 8, 2)))
        .await
        .unwrap();

    let current = store.load_current().unwrap().unwrap();
    assert_eq!(current.r#ref, "s_full");

    collaborators.pipeline(&store, root).run(true).await.unwrap();

    let obj = collaborators.remote.get("pool1/diff_2026-08-02/part000000.zst.age").unwrap();
    assert_eq!(obj.metadata.get("ref-snapshot"), Some(&"s_full".to_string()));
}

/// A five-chunk full backup drains every stage — split, compress,
/// `compress_test`, `compress_hash`, encrypt, `encrypt_test` (each chunk
/// checked against its own `encrypt_expected_hash` entry), upload, clear —
/// and reaches `done` with five objects in the remote store, across the
/// full crate boundary rather than the driver's own unit tests alone.
#[tokio::test]
async fn multi_chunk_backup_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state"));
    let root = dir.path().join("temp");

    let mut collaborators = Collaborators::fresh(vec!["s1"], 5);
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();

    collaborators.pipeline(&store, root).run(true).await.unwrap();

    assert_eq!(collaborators.remote.key_count(), 5);
    assert!(store.load_queue().unwrap().is_empty());
    assert!(store.load_current().unwrap().is_none());
    assert_eq!(store.load_latest().unwrap().get("pool1", BackupType::Full).unwrap().snapshot, "s1");
}

/// `dequeue` leaves `current` cleared and the queue untouched when a task
/// fails before `done` — a failed task is not silently dropped from the
/// queue just because the driver stopped advancing it.
#[tokio::test]
async fn a_stalled_task_is_not_dequeued() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state"));
    let root = dir.path().join("temp");

    let mut collaborators = Collaborators::fresh(vec!["s1"], 2);
    enqueue(&store, &collaborators.producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();

    let err = collaborators.pipeline(&store, root).run(true).await.unwrap_err();
    assert!(matches!(err, PipelineError::VerificationFailure { .. }));

    assert_eq!(store.load_queue().unwrap().len(), 1);
    assert!(store.load_current().unwrap().is_some());
}

/// `dequeue` called directly (as `done` calls it) advances to the next
/// queued target even when the prior task's own collaborators have since
/// been dropped — state on disk is the only thing `dequeue` depends on.
#[tokio::test]
async fn dequeue_after_restart_still_advances_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state"));

    let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, CHUNK_SIZE);
    enqueue(&store, &producer, BackupTarget::new("pool1", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();
    enqueue(&store, &producer, BackupTarget::new("pool2", BackupType::Full, date(2026, 8, 1)))
        .await
        .unwrap();

    // A fresh producer instance, as a restarted process would construct.
    let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, CHUNK_SIZE);
    dequeue(&store, &producer).await.unwrap();

    let current = store.load_current().unwrap().unwrap();
    assert_eq!(current.dataset, "pool2");
    assert_eq!(store.load_queue().unwrap().len(), 1);
}
