// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use crate::BackupTarget;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// FIFO of pending backup targets, persisted as a whole document.
///
/// Enqueue appends; dequeue pops the front once its `CurrentTask` reaches
/// `Done`. Order is the only thing that matters — there is no priority and
/// no dedup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQueue {
    targets: VecDeque<BackupTarget>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: BackupTarget) {
        self.targets.push_back(target);
    }

    pub fn peek_front(&self) -> Option<&BackupTarget> {
        self.targets.front()
    }

    pub fn pop_front(&mut self) -> Option<BackupTarget> {
        self.targets.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackupTarget> {
        self.targets.iter()
    }
}
