// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::{BackupType, CurrentTask};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Stream chunk filename stem the snapshot producer writes, e.g. `part`
/// yields `part000000`, `part000001`, ...
const CHUNK_STEM: &str = "part";

/// The working directory for one task: `<root>/<dataset>/<type>_<date>`.
///
/// Deterministic in every component so a restarted process derives the same
/// path a crashed one was using, with no state beyond `dataset`/`type`/`date`
/// needed to find it again.
pub fn task_temp_dir(root: &Path, dataset: &str, backup_type: BackupType, target_date: NaiveDate) -> PathBuf {
    root.join(dataset)
        .join(format!("{}_{}", backup_type.as_str(), target_date.format("%Y-%m-%d")))
}

/// The chunk filename at each stage of the pipeline for chunk `index` of
/// `task`, rooted at its temp directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPaths {
    pub split: PathBuf,
    pub compressed: PathBuf,
    pub encrypted: PathBuf,
}

/// Build the chunk filename ladder for chunk `index`, given the codec
/// extensions in use (e.g. `zst`, `age`). A fixed-size chunker numbers parts
/// `000000`, `000001`, ... and each stage appends its own extension rather
/// than replacing the file, so every intermediate artifact stays addressable
/// until `clear` removes it.
pub fn chunk_path(
    task_dir: &Path,
    index: u64,
    compression_ext: &str,
    encryption_ext: &str,
) -> ChunkPaths {
    let split = task_dir.join(format!("{CHUNK_STEM}{index:06}"));
    let compressed = split.with_extension(compression_ext.trim_start_matches('.'));
    let encrypted = compressed.with_extension(format!(
        "{}.{}",
        compression_ext.trim_start_matches('.'),
        encryption_ext.trim_start_matches('.')
    ));
    ChunkPaths {
        split,
        compressed,
        encrypted,
    }
}

/// Convenience overload driven directly by a [`CurrentTask`] plus codec
/// extensions, for call sites that already have the task in hand.
pub fn chunk_path_for_task(
    root: &Path,
    task: &CurrentTask,
    index: u64,
    compression_ext: &str,
    encryption_ext: &str,
) -> ChunkPaths {
    let dir = task_temp_dir(root, &task.dataset, task.backup_type, task.target_date);
    chunk_path(&dir, index, compression_ext, encryption_ext)
}
