// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use bkp_core::{CurrentTask, StageName};

/// The outcome of inspecting a task's `Stage`: what to do next, and where
/// it stands. `progress`/`target` are signed so a counter-exceeds-bound
/// violation can be reported as negative values of the same shape as the
/// normal case, never mixed signs (see [`Inference::is_error`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inference {
    pub stage: StageName,
    pub progress: i64,
    pub target: i64,
}

impl Inference {
    fn new(stage: StageName, progress: i64, target: i64) -> Self {
        Self { stage, progress, target }
    }

    pub fn is_error(&self) -> bool {
        self.progress < 0 || self.target < 0
    }
}

/// A per-chunk counter and, where the ladder pairs one with it, the hash
/// check that follows once that counter catches up to `len(split)`.
struct Step {
    stage: StageName,
    counter: fn(&CurrentTask) -> u64,
    paired_hash: Option<(fn(&CurrentTask) -> bool, StageName)>,
}

fn ladder() -> [Step; 6] {
    [
        Step { stage: StageName::Compress, counter: |t| t.stage.compressed, paired_hash: None },
        Step {
            stage: StageName::CompressTest,
            counter: |t| t.stage.compressed_test,
            paired_hash: Some((|t| t.stage.compressed_hash.is_empty(), StageName::CompressHash)),
        },
        Step { stage: StageName::Encrypt, counter: |t| t.stage.encrypted, paired_hash: None },
        Step {
            stage: StageName::EncryptTest,
            counter: |t| t.stage.encrypted_test,
            paired_hash: Some((|t| t.stage.encrypted_hash.is_empty(), StageName::EncryptHash)),
        },
        Step { stage: StageName::Upload, counter: |t| t.stage.uploaded, paired_hash: None },
        Step { stage: StageName::Clear, counter: |t| t.stage.cleared, paired_hash: None },
    ]
}

/// Pure function from a task's persisted state to `(stage, progress,
/// target)`. Evaluated as an ordered ladder: the first condition met
/// determines the return. Callers must treat `progress < 0 || target < 0`
/// as a hard error and refuse to advance.
///
/// Splitting runs to completion (`len(split) == split_quantity`) before any
/// chunk enters `compress` — the per-chunk stages below read files that an
/// earlier stage in the same chunk's lifecycle has not yet deleted, and that
/// only holds if every chunk reaches a given stage before any chunk moves
/// past it.
pub fn infer(task: &CurrentTask) -> Inference {
    let stage = &task.stage;

    if stage.snapshot_exported.is_empty() {
        return Inference::new(StageName::SnapshotExport, 0, 0);
    }
    if !stage.snapshot_tested {
        return Inference::new(StageName::SnapshotTest, 0, 0);
    }
    if stage.snapshot_hash.is_empty() {
        return Inference::new(StageName::SnapshotHash, 0, 0);
    }
    if task.split_quantity <= 0 {
        return Inference::new(StageName::SnapshotExport, -1, task.split_quantity);
    }

    let split_len = stage.split_count() as i64;
    let split_quantity = task.split_quantity;

    if split_len > split_quantity {
        return Inference::new(StageName::Split, -split_quantity, -split_len);
    }
    if split_len < split_quantity {
        return Inference::new(StageName::Split, 0, 0);
    }

    for step in ladder() {
        let c = (step.counter)(task) as i64;
        if c < split_len {
            return Inference::new(step.stage, split_len, c);
        }
        if c > split_len {
            return Inference::new(step.stage, -split_len, -c);
        }
        if let Some((is_empty, hash_stage)) = step.paired_hash {
            if is_empty(task) {
                return Inference::new(hash_stage, split_len, split_len);
            }
        }
    }

    Inference::new(StageName::Done, 0, split_quantity)
}
