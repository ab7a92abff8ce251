// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::{BackupType, Stage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel written into `CurrentTask::r#ref` when a `diff`/`incr` task
/// cannot resolve its required reference snapshot. Chosen so the export
/// stage fails loudly (no ZFS snapshot is ever literally named this) instead
/// of the task silently falling back to a full backup.
pub const ERROR_NONE_REF: &str = "ERROR_NONE";

/// An enqueued job. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTarget {
    pub dataset: String,
    pub backup_type: BackupType,
    pub target_date: NaiveDate,
}

impl BackupTarget {
    pub fn new(dataset: impl Into<String>, backup_type: BackupType, target_date: NaiveDate) -> Self {
        Self {
            dataset: dataset.into(),
            backup_type,
            target_date,
        }
    }
}

/// The expansion of the head-of-queue target with resolved snapshots.
///
/// Created fresh whenever a target reaches the head of the queue; mutated
/// only by stage handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTask {
    pub dataset: String,
    pub backup_type: BackupType,
    pub target_date: NaiveDate,
    /// Snapshot name to send.
    pub base: String,
    /// Reference snapshot for incremental sends; empty for `full`;
    /// [`ERROR_NONE_REF`] when a required reference could not be resolved.
    #[serde(rename = "ref")]
    pub r#ref: String,
    /// Number of chunks the chunker will produce; unknown (0) before export.
    pub split_quantity: i64,
    /// Hash of the full stream file, once computed.
    #[serde(default)]
    pub stream_hash: Vec<u8>,
    pub stage: Stage,
}

impl CurrentTask {
    /// Build a fresh task for `target` with an already-resolved `base`/`ref`
    /// pair and an all-zero `Stage`. Resolution itself (snapshot listing,
    /// `latest` lookups) is the caller's job — see `bkp_engine::lifecycle`.
    pub fn fresh(target: &BackupTarget, base: String, r#ref: String) -> Self {
        Self {
            dataset: target.dataset.clone(),
            backup_type: target.backup_type,
            target_date: target.target_date,
            base,
            r#ref,
            split_quantity: 0,
            stream_hash: Vec::new(),
            stage: Stage::default(),
        }
    }

    /// True for `diff`/`incr` tasks whose reference snapshot could not be
    /// resolved at initialization time.
    pub fn has_missing_reference(&self) -> bool {
        self.r#ref == ERROR_NONE_REF
    }

    /// `type == full` implies `ref == ""`; `diff`/`incr` implies `ref != ""`
    /// once the snapshot has been exported.
    pub fn reference_invariant_holds(&self) -> bool {
        match self.backup_type {
            BackupType::Full => self.r#ref.is_empty(),
            BackupType::Diff | BackupType::Incr => {
                self.stage.snapshot_exported.is_empty() || !self.r#ref.is_empty()
            }
        }
    }
}
