// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::PipelineError;
use bkp_adapters::SnapshotProducer;
use bkp_core::{BackupTarget, BackupType, CurrentTask, LatestSnapshotIndex, TaskQueue, ERROR_NONE_REF};
use bkp_storage::StateStore;

/// Enqueues `target` and, if it is the only entry, initializes it as the
/// current task immediately.
pub async fn enqueue(
    store: &StateStore,
    producer: &dyn SnapshotProducer,
    target: BackupTarget,
) -> Result<(), PipelineError> {
    let mut queue = store.load_queue()?;
    let was_empty = queue.is_empty();
    queue.push(target);
    store.save_queue(&queue)?;

    if was_empty && store.load_current()?.is_none() {
        initialize_head(store, producer).await?;
    }
    Ok(())
}

/// Pops the completed head of the queue and initializes the next target, if
/// any. Called once a task reaches `Done`.
pub async fn dequeue(store: &StateStore, producer: &dyn SnapshotProducer) -> Result<(), PipelineError> {
    let mut queue = store.load_queue()?;
    queue.pop_front();
    store.save_queue(&queue)?;
    store.clear_current()?;

    if !queue.is_empty() {
        initialize_head(store, producer).await?;
    }
    Ok(())
}

/// Builds a fresh `CurrentTask` for the queue's front target and persists it.
/// `base` is the newest snapshot `Producer.list` reports for the dataset;
/// `ref` is resolved from the persisted `LatestSnapshotIndex` — never from
/// the producer's own `get_latest`, which is not the canonical pointer (see
/// `bkp_adapters::SnapshotProducer`'s doc comment).
async fn initialize_head(store: &StateStore, producer: &dyn SnapshotProducer) -> Result<(), PipelineError> {
    let queue = store.load_queue()?;
    let target = match queue.peek_front() {
        Some(t) => t.clone(),
        None => return Ok(()),
    };

    let snapshots = producer.list(&target.dataset).await?;
    let base = snapshots.first().cloned().unwrap_or_default();
    let r#ref = resolve_reference(&store.load_latest()?, &target);

    let task = CurrentTask::fresh(&target, base, r#ref);
    store.save_current(&task)?;
    Ok(())
}

/// `full` needs no reference. `diff`/`incr` resolve against the latest
/// `LatestEntry` of the prior type; when none is on record the task is
/// still initialized, but with [`ERROR_NONE_REF`] so the export stage fails
/// loudly instead of silently downgrading to a full backup.
fn resolve_reference(latest: &LatestSnapshotIndex, target: &BackupTarget) -> String {
    match target.backup_type {
        BackupType::Full => String::new(),
        BackupType::Diff | BackupType::Incr => latest
            .reference_for(&target.dataset, target.backup_type)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_else(|| ERROR_NONE_REF.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bkp_adapters::FakeSnapshotProducer;
    use bkp_core::test_support::{date, index_with_full};

    fn target(dataset: &str, ty: BackupType) -> BackupTarget {
        BackupTarget::new(dataset, ty, date(2026, 8, 1))
    }

    #[tokio::test]
    async fn enqueue_into_empty_queue_initializes_current_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s2".into(), "s1".into()], 1, 4);

        enqueue(&store, &producer, target("pool1", BackupType::Full))
            .await
            .unwrap();

        let current = store.load_current().unwrap().unwrap();
        assert_eq!(current.dataset, "pool1");
        assert_eq!(current.base, "s2");
        assert_eq!(current.r#ref, "");
    }

    #[tokio::test]
    async fn enqueue_behind_a_running_task_does_not_disturb_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, 4);

        enqueue(&store, &producer, target("pool1", BackupType::Full))
            .await
            .unwrap();
        enqueue(&store, &producer, target("pool2", BackupType::Full))
            .await
            .unwrap();

        let current = store.load_current().unwrap().unwrap();
        assert_eq!(current.dataset, "pool1");
        assert_eq!(store.load_queue().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn diff_resolves_reference_from_latest_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s2".into(), "s1".into()], 1, 4);
        store.save_latest(&index_with_full("pool1", "s_full_0")).unwrap();

        enqueue(&store, &producer, target("pool1", BackupType::Diff))
            .await
            .unwrap();

        let current = store.load_current().unwrap().unwrap();
        assert_eq!(current.r#ref, "s_full_0");
    }

    #[tokio::test]
    async fn diff_with_no_recorded_full_gets_the_missing_reference_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, 4);

        enqueue(&store, &producer, target("pool1", BackupType::Diff))
            .await
            .unwrap();

        let current = store.load_current().unwrap().unwrap();
        assert!(current.has_missing_reference());
    }

    #[tokio::test]
    async fn dequeue_clears_current_and_initializes_the_next_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, 4);

        enqueue(&store, &producer, target("pool1", BackupType::Full))
            .await
            .unwrap();
        enqueue(&store, &producer, target("pool2", BackupType::Full))
            .await
            .unwrap();

        dequeue(&store, &producer).await.unwrap();

        let current = store.load_current().unwrap().unwrap();
        assert_eq!(current.dataset, "pool2");
        assert_eq!(store.load_queue().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dequeue_from_a_queue_of_one_leaves_no_current_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let producer = FakeSnapshotProducer::new(vec!["s1".into()], 1, 4);

        enqueue(&store, &producer, target("pool1", BackupType::Full))
            .await
            .unwrap();
        dequeue(&store, &producer).await.unwrap();

        assert!(store.load_current().unwrap().is_none());
        assert!(store.load_queue().unwrap().is_empty());
    }
}
