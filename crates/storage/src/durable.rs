// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::StorageError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// write-to-temp + fsync + rename + fsync-directory. `path` ends up either
/// fully containing the new bytes or untouched — never partially written.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path.parent().ok_or_else(|| {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;
    std::fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension("tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(bytes)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    std::fs::rename(&tmp_path, path)?;

    let dir = File::open(parent)?;
    dir.sync_all()?;
    Ok(())
}

/// `None` when the file does not exist yet (cold start); propagates any
/// other I/O error.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
