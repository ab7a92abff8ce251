// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use bkp_adapters::AdapterError;
use bkp_core::StageName;
use bkp_storage::StorageError;
use thiserror::Error;

/// The driver's error taxonomy. Only `ShutdownRequested` is recovered at the
/// driver boundary; everything else aborts the current `run` call and is
/// surfaced to the caller for logging.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("state inconsistency at stage {stage:?}: progress={progress}, target={target}")]
    StateInconsistency {
        stage: StageName,
        progress: i64,
        target: i64,
    },

    #[error("verification failed at stage {stage:?}")]
    VerificationFailure { stage: StageName },

    #[error("missing reference snapshot for dataset {dataset}")]
    MissingReference { dataset: String },

    #[error("collaborator I/O error: {0}")]
    CollaboratorIo(#[from] AdapterError),

    #[error("state store error: {0}")]
    Storage(#[from] StorageError),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("unknown stage encountered: {0:?}")]
    ProgrammerError(StageName),
}

impl PipelineError {
    /// Structured fields for the single log record a failing `run` emits.
    pub fn log_fields(&self) -> (Option<StageName>, Option<i64>, Option<i64>, &'static str) {
        match self {
            PipelineError::StateInconsistency { stage, progress, target } => {
                (Some(*stage), Some(*progress), Some(*target), "state_inconsistency")
            }
            PipelineError::VerificationFailure { stage } => (Some(*stage), None, None, "verification_failure"),
            PipelineError::MissingReference { .. } => (None, None, None, "missing_reference"),
            PipelineError::CollaboratorIo(_) => (None, None, None, "collaborator_io"),
            PipelineError::Storage(_) => (None, None, None, "collaborator_io"),
            PipelineError::ShutdownRequested => (None, None, None, "shutdown_requested"),
            PipelineError::ProgrammerError(_) => (None, None, None, "programmer_error"),
        }
    }
}
