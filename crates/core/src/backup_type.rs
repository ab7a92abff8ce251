// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backup flavor. `Full` stands alone; `Diff` is relative to the latest
/// `Full`; `Incr` is relative to the latest `Diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Diff,
    Incr,
}

impl BackupType {
    /// The stage tag carried in remote object tags and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "full",
            BackupType::Diff => "diff",
            BackupType::Incr => "incr",
        }
    }

    /// The backup type this one resolves its reference snapshot against,
    /// or `None` for `Full`, which needs no reference.
    pub fn reference_type(&self) -> Option<BackupType> {
        match self {
            BackupType::Full => None,
            BackupType::Diff => Some(BackupType::Full),
            BackupType::Incr => Some(BackupType::Diff),
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(BackupType::Full),
            "diff" => Ok(BackupType::Diff),
            "incr" => Ok(BackupType::Incr),
            other => Err(format!("unknown backup type: {other}")),
        }
    }
}
