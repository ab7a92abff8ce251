// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use thiserror::Error;

/// Errors surfaced by any collaborator call.
///
/// `Shutdown` is cooperative cancellation: a collaborator observes it (e.g.
/// between snapshot stream segments, mid-upload) and returns it instead of
/// completing the operation. Every other variant is a genuine I/O or
/// verification failure.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot producer error: {0}")]
    Snapshot(String),

    #[error("compression codec error: {0}")]
    Compression(String),

    #[error("encryption codec error: {0}")]
    Encryption(String),

    #[error("remote store error: {0}")]
    Remote(String),

    #[error("shutdown requested")]
    Shutdown,
}
