// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use thiserror::Error;

/// I/O or deserialization error touching persisted state. Both kinds are
/// fatal: the caller cannot tell whether on-disk state is internally
/// consistent, so the only safe response is to abort and let an operator
/// inspect the working directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}
