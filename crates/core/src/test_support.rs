// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

//! Shared test fixtures for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{BackupTarget, BackupType, CurrentTask, LatestEntry, LatestSnapshotIndex, Stage, TaskQueue};
use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub fn target(dataset: &str, backup_type: BackupType) -> BackupTarget {
    BackupTarget::new(dataset, backup_type, date(2026, 8, 1))
}

pub fn fresh_task(dataset: &str, backup_type: BackupType, base: &str, r#ref: &str) -> CurrentTask {
    CurrentTask::fresh(&target(dataset, backup_type), base.to_string(), r#ref.to_string())
}

/// A task already positioned partway through the pipeline, with `n` split
/// chunks hashed into its chain, for tests that exercise mid-pipeline
/// resumption.
pub fn task_with_split_progress(dataset: &str, base: &str, n: u64) -> CurrentTask {
    let mut task = fresh_task(dataset, BackupType::Full, base, "");
    task.split_quantity = n as i64;
    task.stage.snapshot_exported = format!("{base}.zfs");
    task.stage.snapshot_tested = true;
    task.stage.snapshot_hash = vec![0xaa; 32];
    for i in 0..n {
        task.stage.split.push(vec![i as u8; 32]);
    }
    task
}

pub fn latest_entry(snapshot: &str) -> LatestEntry {
    LatestEntry::new(snapshot, date(2026, 7, 1))
}

pub fn index_with_full(dataset: &str, snapshot: &str) -> LatestSnapshotIndex {
    let mut idx = LatestSnapshotIndex::new();
    idx.set(dataset, BackupType::Full, latest_entry(snapshot));
    idx
}

pub fn queue_with(datasets: &[&str]) -> TaskQueue {
    let mut q = TaskQueue::new();
    for d in datasets {
        q.push(target(d, BackupType::Full));
    }
    q
}

pub fn empty_stage() -> Stage {
    Stage::default()
}
