// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level failure modes for one `bkpd` invocation, mapped to the process
/// exit code in `main`. Distinct from `bkp_engine::PipelineError`, which this
/// wraps: a `RunnerError` also covers the ambient concerns (config, the
/// advisory lock) that sit outside the pipeline core.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("another bkpd invocation holds the lock at {0}")]
    LockHeld(std::path::PathBuf),

    #[error("lock file I/O error: {0}")]
    LockIo(#[source] std::io::Error),

    #[error("invalid target date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Pipeline(#[from] bkp_engine::PipelineError),

    #[error(transparent)]
    Storage(#[from] bkp_storage::StorageError),

    #[error(transparent)]
    Adapter(#[from] bkp_adapters::AdapterError),
}

/// Process exit codes, per the collaborator contract: 0 = idle (queue was
/// empty, nothing to do), 1 = fatal error, 2 = shutdown requested.
pub const EXIT_IDLE: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_SHUTDOWN: i32 = 2;

impl RunnerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Pipeline(bkp_engine::PipelineError::ShutdownRequested) => EXIT_SHUTDOWN,
            _ => EXIT_FATAL,
        }
    }
}
