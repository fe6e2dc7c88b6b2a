// src/cache/store.rs

//! Persistent state store: one fingerprint record per task name.
//!
//! The build cache only needs `get`/`set`. Records are written only after a
//! task was confirmed to have run, and are never deleted automatically.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::fingerprint::{FileDigests, Fingerprint};
use crate::errors::{DagmakeError, Result};
use crate::types::{Durability, TaskName};

/// Version written into the state file; files with another version are
/// treated as unreadable.
pub const STATE_FILE_VERSION: u32 = 1;

/// Default location of the state file, relative to the project root.
pub const DEFAULT_STATE_FILE: &str = ".dagmake/state.json";

/// Abstract key-value storage for task fingerprints, keyed by task name.
pub trait StateStore: Send + Sync {
    /// Last committed fingerprint for `task`, or `None` if it never ran.
    fn get(&self, task: &str) -> Result<Option<Fingerprint>>;
    /// Overwrite the record for `task`.
    fn set(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()>;
    /// Make buffered writes durable. No-op for stores that write through.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Stores fingerprints in memory only.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    map: HashMap<TaskName, FileDigests>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, task: &str) -> Result<Option<Fingerprint>> {
        Ok(self
            .map
            .get(task)
            .map(|digests| Fingerprint::new(task, digests.clone())))
    }

    fn set(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()> {
        self.map
            .insert(task.to_string(), fingerprint.digests.clone());
        debug!(task = %task, files = fingerprint.digests.len(), "stored fingerprint (memory)");
        Ok(())
    }
}

/// On-disk layout of the state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    records: BTreeMap<TaskName, FileDigests>,
}

/// Stores fingerprints in a JSON file.
///
/// The whole file is loaded on [`open`](FileStateStore::open). Writes replace
/// the file atomically (temp file + rename), so an interrupted write leaves
/// the previous state intact.
///
/// If the file exists but cannot be read or parsed, the store still opens:
/// lookups for tasks not written during this process fail with
/// [`DagmakeError::Store`], which the build cache treats as stale.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    durability: Durability,
    records: BTreeMap<TaskName, FileDigests>,
    load_error: Option<String>,
    dirty: bool,
}

impl FileStateStore {
    pub fn open(path: impl Into<PathBuf>, durability: Durability) -> Result<Self> {
        let path = path.into();
        let (records, load_error) = match load_records(&path) {
            Ok(records) => (records, None),
            Err(err) => {
                warn!(path = ?path, error = %err, "state file unreadable; treating all tasks as stale");
                (BTreeMap::new(), Some(err.to_string()))
            }
        };
        info!(path = ?path, records = records.len(), ?durability, "opened state store");
        Ok(Self {
            path,
            durability,
            records,
            load_error,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush pending writes and release the store.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    fn persist(&mut self) -> Result<()> {
        let state = StateFile {
            version: STATE_FILE_VERSION,
            records: self.records.clone(),
        };
        write_atomically(&self.path, &state, self.durability == Durability::Sync)?;
        self.dirty = false;
        debug!(path = ?self.path, records = self.records.len(), "state file written");
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn get(&self, task: &str) -> Result<Option<Fingerprint>> {
        if let Some(digests) = self.records.get(task) {
            return Ok(Some(Fingerprint::new(task, digests.clone())));
        }
        match &self.load_error {
            Some(err) => Err(DagmakeError::Store(format!(
                "record for '{}' unavailable: {}",
                task, err
            ))),
            None => Ok(None),
        }
    }

    fn set(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()> {
        let previous = self
            .records
            .insert(task.to_string(), fingerprint.digests.clone());
        let was_dirty = self.dirty;
        self.dirty = true;
        if self.durability == Durability::Sync {
            if let Err(err) = self.persist() {
                // A record that never reached disk must not look committed.
                match previous {
                    Some(digests) => self.records.insert(task.to_string(), digests),
                    None => self.records.remove(task),
                };
                self.dirty = was_dirty;
                return Err(err);
            }
        }
        debug!(task = %task, "stored fingerprint (file)");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }
}

impl Drop for FileStateStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(err) = self.persist() {
                warn!(path = ?self.path, error = %err, "failed to persist state on drop");
            }
        }
    }
}

fn load_records(path: &Path) -> Result<BTreeMap<TaskName, FileDigests>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let bytes = fs::read(path).map_err(|e| store_error("reading", path, e))?;
    let state: StateFile =
        serde_json::from_slice(&bytes).map_err(|e| store_error("parsing", path, e))?;
    if state.version != STATE_FILE_VERSION {
        return Err(DagmakeError::Store(format!(
            "state file {:?} has version {}, expected {}",
            path, state.version, STATE_FILE_VERSION
        )));
    }
    Ok(state.records)
}

fn write_atomically(path: &Path, state: &StateFile, sync: bool) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state).map_err(|e| store_error("encoding", path, e))?;

    let write = || -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating state directory at {:?}", parent))?;
            }
        }
        let tmp = temp_path(path);
        let mut file = File::create(&tmp)
            .with_context(|| format!("creating temp state file at {:?}", tmp))?;
        file.write_all(&bytes)
            .with_context(|| format!("writing temp state file at {:?}", tmp))?;
        if sync {
            file.sync_all()
                .with_context(|| format!("syncing temp state file at {:?}", tmp))?;
        }
        drop(file);
        fs::rename(&tmp, path)
            .with_context(|| format!("replacing state file at {:?}", path))?;
        Ok(())
    };

    write().map_err(|e| DagmakeError::Store(format!("{:#}", e)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn store_error(action: &str, path: &Path, err: impl std::fmt::Display) -> DagmakeError {
    DagmakeError::Store(format!("{} state file {:?}: {}", action, path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint::Digest;
    use tempfile::tempdir;

    fn fingerprint(task: &str, path: &str, hash: &str) -> Fingerprint {
        Fingerprint::new(
            task,
            FileDigests::from([(PathBuf::from(path), Digest::Content(hash.into()))]),
        )
    }

    #[test]
    fn memory_store_overwrites_records() {
        let mut store = MemoryStateStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.set("a", &fingerprint("a", "x", "1")).unwrap();
        store.set("a", &fingerprint("a", "x", "2")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap(), Some(fingerprint("a", "x", "2")));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        let mut store = FileStateStore::open(&path, Durability::Sync).unwrap();
        store.set("a", &fingerprint("a", "in.txt", "abc")).unwrap();
        assert!(path.exists());
        store.close().unwrap();

        let reopened = FileStateStore::open(&path, Durability::Sync).unwrap();
        assert_eq!(
            reopened.get("a").unwrap(),
            Some(fingerprint("a", "in.txt", "abc"))
        );
        assert!(reopened.get("b").unwrap().is_none());
    }

    #[test]
    fn relaxed_store_writes_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = FileStateStore::open(&path, Durability::Relaxed).unwrap();
        store.set("a", &fingerprint("a", "x", "1")).unwrap();
        assert!(!path.exists());
        assert!(store.get("a").unwrap().is_some());

        store.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_fails_lookups_but_accepts_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = FileStateStore::open(&path, Durability::Sync).unwrap();
        assert!(matches!(store.get("a"), Err(DagmakeError::Store(_))));

        store.set("a", &fingerprint("a", "x", "1")).unwrap();
        assert!(store.get("a").unwrap().is_some());
        assert!(store.get("b").is_err());
    }

    #[test]
    fn failed_write_does_not_keep_the_record() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("state.json");

        let mut store = FileStateStore::open(&path, Durability::Sync).unwrap();
        assert!(matches!(
            store.set("a", &fingerprint("a", "x", "1")),
            Err(DagmakeError::Store(_))
        ));
        assert!(store.get("a").unwrap().is_none());
        assert!(store.flush().is_ok());
    }

    #[test]
    fn failed_write_restores_previous_record() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let path = state_dir.join("state.json");

        let mut store = FileStateStore::open(&path, Durability::Sync).unwrap();
        store.set("a", &fingerprint("a", "x", "1")).unwrap();

        fs::remove_dir_all(&state_dir).unwrap();
        fs::write(&state_dir, "now a file").unwrap();
        assert!(store.set("a", &fingerprint("a", "x", "2")).is_err());
        assert_eq!(store.get("a").unwrap(), Some(fingerprint("a", "x", "1")));
    }

    #[test]
    fn absent_digest_is_stored_as_empty_string() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = FileStateStore::open(&path, Durability::Sync).unwrap();
        let fp = Fingerprint::new(
            "t",
            FileDigests::from([(PathBuf::from("missing"), Digest::Absent)]),
        );
        store.set("t", &fp).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""missing": """#), "unexpected layout: {raw}");
    }
}
