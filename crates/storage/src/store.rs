// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::durable::{read_if_exists, write_atomic};
use crate::StorageError;
use bkp_core::{CurrentTask, LatestSnapshotIndex, TaskQueue};
use std::path::{Path, PathBuf};

const QUEUE_FILE: &str = "queue.mp";
const CURRENT_FILE: &str = "current.mp";
const LATEST_FILE: &str = "latest.mp";

/// The three independently loadable, independently savable documents that
/// make up persisted pipeline state. No other component reads or writes
/// these files.
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn load_queue(&self) -> Result<TaskQueue, StorageError> {
        load_or_default(&self.path(QUEUE_FILE))
    }

    pub fn save_queue(&self, queue: &TaskQueue) -> Result<(), StorageError> {
        save(&self.path(QUEUE_FILE), queue)
    }

    /// `None` when no task has been initialized yet (empty queue, or a
    /// fresh working directory).
    pub fn load_current(&self) -> Result<Option<CurrentTask>, StorageError> {
        match read_if_exists(&self.path(CURRENT_FILE))? {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save_current(&self, task: &CurrentTask) -> Result<(), StorageError> {
        save(&self.path(CURRENT_FILE), task)
    }

    pub fn clear_current(&self) -> Result<(), StorageError> {
        let path = self.path(CURRENT_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_latest(&self) -> Result<LatestSnapshotIndex, StorageError> {
        load_or_default(&self.path(LATEST_FILE))
    }

    pub fn save_latest(&self, index: &LatestSnapshotIndex) -> Result<(), StorageError> {
        save(&self.path(LATEST_FILE), index)
    }
}

fn load_or_default<T: Default + for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<T, StorageError> {
    match read_if_exists(path)? {
        Some(bytes) => Ok(rmp_serde::from_slice(&bytes)?),
        None => Ok(T::default()),
    }
}

fn save<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = rmp_serde::to_vec(value)?;
    write_atomic(path, &bytes)
}
