// src/cache/fingerprint.rs

//! Snapshots of a task's file-dependency state.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::hash::compute_file_hash;
use crate::dag::Task;
use crate::errors::{DagmakeError, Result};
use crate::fs::FileSystem;
use crate::types::TaskName;

/// Content digest of one file dependency.
///
/// Persisted as a plain string; the empty string encodes [`Digest::Absent`].
/// An empty *file* still has a real content digest, so the two never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Digest {
    Absent,
    Content(String),
}

impl Digest {
    pub fn is_absent(&self) -> bool {
        matches!(self, Digest::Absent)
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Digest::Absent
        } else {
            Digest::Content(s)
        }
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> Self {
        match d {
            Digest::Absent => String::new(),
            Digest::Content(s) => s,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Digest::Absent => f.write_str("<absent>"),
            Digest::Content(s) => f.write_str(s),
        }
    }
}

/// Path to digest mapping, the unit persisted per task.
pub type FileDigests = BTreeMap<PathBuf, Digest>;

/// Digest a single path, mapping a missing file to [`Digest::Absent`].
pub fn digest_path(fs: &dyn FileSystem, path: &Path) -> Result<Digest> {
    if !fs.exists(path) {
        return Ok(Digest::Absent);
    }
    compute_file_hash(fs, path)
        .map(Digest::Content)
        .map_err(|source| DagmakeError::Fingerprint {
            path: path.to_path_buf(),
            source,
        })
}

/// A task's name plus the digest of each of its file dependencies.
///
/// Two fingerprints are equal iff they cover the same paths with the same
/// digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub task: TaskName,
    pub digests: FileDigests,
}

impl Fingerprint {
    pub fn new(task: impl Into<TaskName>, digests: FileDigests) -> Self {
        Self {
            task: task.into(),
            digests,
        }
    }

    /// Snapshot the current state of `task.file_dep`.
    ///
    /// Missing files are recorded as absent. Any other read failure aborts
    /// the snapshot for this task.
    pub fn compute(task: &Task, fs: &dyn FileSystem) -> Result<Self> {
        let mut digests = FileDigests::new();
        for path in task.file_dep.iter() {
            digests.insert(path.clone(), digest_path(fs, path)?);
        }
        Ok(Self::new(task.name.clone(), digests))
    }

    /// Paths whose digest differs between `previous` and `self`, including
    /// paths present on only one side. Sorted.
    pub fn changed_paths(&self, previous: &Fingerprint) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = self
            .digests
            .iter()
            .filter(|(path, digest)| previous.digests.get(*path) != Some(*digest))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            previous
                .digests
                .keys()
                .filter(|path| !self.digests.contains_key(*path))
                .cloned(),
        );
        changed.sort();
        changed
    }
}
