// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Collaborator implementations for external I/O: hashing, chunking,
//! compression/encryption codecs, snapshot production, remote upload, and
//! plain filesystem access. `bkp-engine` depends only on the traits here,
//! never on a concrete backend.

mod chunker;
mod codec;
mod error;
mod filesystem;
mod hasher;
mod remote;
mod snapshot;

pub use chunker::{Chunker, FixedSizeChunker};
pub use codec::{AesGcmCodec, CompressionCodec, EncryptionCodec, ZstdCodec};
pub use error::AdapterError;
pub use filesystem::{Filesystem, OsFilesystem};
pub use hasher::{Hasher, Sha256Hasher};
pub use remote::{Checksum, ObjectStoreRemote, RemoteStore};
pub use snapshot::{SnapshotProducer, ZfsSnapshotProducer};

#[cfg(any(test, feature = "test-support"))]
pub use chunker::FakeChunker;
#[cfg(any(test, feature = "test-support"))]
pub use codec::{FakeCompressionCodec, FakeEncryptionCodec};
#[cfg(any(test, feature = "test-support"))]
pub use filesystem::FakeFilesystem;
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemoteStore, UploadedObject};
#[cfg(any(test, feature = "test-support"))]
pub use snapshot::{ExportCall, FakeSnapshotProducer};
