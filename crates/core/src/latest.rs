// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::BackupType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single resolved snapshot pointer: its name and the date it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestEntry {
    pub snapshot: String,
    pub date: NaiveDate,
}

impl LatestEntry {
    pub fn new(snapshot: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            snapshot: snapshot.into(),
            date,
        }
    }
}

/// The three pointers tracked per dataset. A dataset with no successful
/// `full` backup yet has all three empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDatasetLatest {
    pub full: Option<LatestEntry>,
    pub diff: Option<LatestEntry>,
    pub incr: Option<LatestEntry>,
}

impl PerDatasetLatest {
    fn slot(&self, backup_type: BackupType) -> &Option<LatestEntry> {
        match backup_type {
            BackupType::Full => &self.full,
            BackupType::Diff => &self.diff,
            BackupType::Incr => &self.incr,
        }
    }

    fn slot_mut(&mut self, backup_type: BackupType) -> &mut Option<LatestEntry> {
        match backup_type {
            BackupType::Full => &mut self.full,
            BackupType::Diff => &mut self.diff,
            BackupType::Incr => &mut self.incr,
        }
    }
}

/// Per-dataset record of the most recent successfully uploaded snapshot of
/// each backup type. Updated only after a task reaches `Done`; never rolled
/// back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestSnapshotIndex {
    datasets: HashMap<String, PerDatasetLatest>,
}

impl LatestSnapshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dataset: &str, backup_type: BackupType) -> Option<&LatestEntry> {
        self.datasets.get(dataset)?.slot(backup_type).as_ref()
    }

    /// The reference entry a task of `backup_type` must resolve against:
    /// `diff` looks up `full`, `incr` looks up `diff`. `full` needs none.
    pub fn reference_for(&self, dataset: &str, backup_type: BackupType) -> Option<&LatestEntry> {
        let reference_type = backup_type.reference_type()?;
        self.get(dataset, reference_type)
    }

    pub fn set(&mut self, dataset: &str, backup_type: BackupType, entry: LatestEntry) {
        let per_dataset = self.datasets.entry(dataset.to_string()).or_default();
        *per_dataset.slot_mut(backup_type) = Some(entry);
    }
}
