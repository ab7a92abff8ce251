// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// A node of the pipeline state machine.
///
/// `Done` and the chunk-indexed stages don't carry their own progress here —
/// the driver derives `(progress, target)` alongside the stage via
/// `bkp_engine::infer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    SnapshotExport,
    SnapshotTest,
    SnapshotHash,
    Split,
    Compress,
    CompressTest,
    CompressHash,
    Encrypt,
    EncryptTest,
    EncryptHash,
    Upload,
    Clear,
    Done,
}

/// Progress counters for the current task.
///
/// Every field here is append-only or monotonically increasing within a
/// task's lifetime; a fresh task gets a fresh, all-zero `Stage`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Non-empty once the producer has written the stream file; holds its name.
    pub snapshot_exported: String,
    /// Producer-native integrity verdict over the exported stream.
    pub snapshot_tested: bool,
    /// Hash of the full stream file, empty until computed.
    #[serde_as(as = "serde_with::Bytes")]
    pub snapshot_hash: Vec<u8>,
    /// Hash chain value after each completed chunk, in chunk order.
    #[serde_as(as = "Vec<serde_with::Bytes>")]
    pub split: Vec<Vec<u8>>,
    pub compressed: u64,
    pub compressed_test: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub compressed_hash: Vec<u8>,
    /// Per-chunk pre-encryption digest, recorded by `encrypt(i)` just before
    /// that chunk is encrypted and consulted by `encrypt_test(i)` — chunk
    /// `i`'s own digest, not the whole-stream `compressed_hash` above.
    #[serde_as(as = "Vec<serde_with::Bytes>")]
    pub encrypt_expected_hash: Vec<Vec<u8>>,
    pub encrypted: u64,
    pub encrypted_test: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub encrypted_hash: Vec<u8>,
    pub uploaded: u64,
    pub cleared: u64,
}

impl Stage {
    /// Number of chunks the splitter has produced a hash for so far.
    pub fn split_count(&self) -> u64 {
        self.split.len() as u64
    }

    /// The most recent chain value, or `None` before the first chunk.
    pub fn last_chain(&self) -> Option<&[u8]> {
        self.split.last().map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stage_is_all_zero() {
        let stage = Stage::default();
        assert_eq!(stage.snapshot_exported, "");
        assert!(!stage.snapshot_tested);
        assert!(stage.snapshot_hash.is_empty());
        assert_eq!(stage.split_count(), 0);
        assert_eq!(stage.compressed, 0);
        assert_eq!(stage.cleared, 0);
        assert!(stage.last_chain().is_none());
    }

    #[test]
    fn last_chain_tracks_split_tail() {
        let mut stage = Stage::default();
        stage.split.push(vec![1, 2, 3]);
        stage.split.push(vec![4, 5, 6]);
        assert_eq!(stage.split_count(), 2);
        assert_eq!(stage.last_chain(), Some(&[4, 5, 6][..]));
    }

    #[test]
    fn serde_round_trip_preserves_byte_fields() {
        let mut stage = Stage::default();
        stage.snapshot_hash = vec![0xde, 0xad, 0xbe, 0xef];
        stage.split.push(vec![1, 2, 3]);
        let bytes = rmp_serde::to_vec(&stage).unwrap();
        let restored: Stage = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(stage, restored);
    }
}
