// src/cache/mod.rs

//! Incremental build cache.
//!
//! - [`hash`] computes blake3 content digests.
//! - [`fingerprint`] snapshots a task's file dependencies.
//! - [`store`] persists one fingerprint per task between runs.
//! - [`build_cache`] decides which tasks are stale and commits new
//!   fingerprints once they ran.

pub mod build_cache;
pub mod fingerprint;
pub mod hash;
pub mod store;

pub use build_cache::{BuildCache, StaleReason, StaleTask, Staleness};
pub use fingerprint::{Digest, FileDigests, Fingerprint};
pub use hash::compute_file_hash;
pub use store::{FileStateStore, MemoryStateStore, StateStore, DEFAULT_STATE_FILE};
