// src/cache/build_cache.rs

//! Staleness classification and fingerprint commits.
//!
//! A task is stale when any of the following holds:
//! - it has no committed record, or the record could not be read;
//! - its current fingerprint differs from the committed one;
//! - one of its file dependencies does not exist;
//! - one of its targets does not exist.
//!
//! A fingerprint read error on an existing file also classifies the task as
//! stale; the error travels with the result instead of aborting the run.
//!
//! [`BuildCache::filter_tasks`] additionally marks a task stale when it reads
//! a file produced by a task already selected earlier in the order, since
//! that input is about to be regenerated. Staleness does not propagate along
//! pure `task_dep` edges.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::cache::fingerprint::Fingerprint;
use crate::cache::store::StateStore;
use crate::dag::Task;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::TaskName;

/// Why a task has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No record: the task never ran successfully.
    NeverRun,
    /// These file dependencies were added, removed or changed content.
    InputsChanged(Vec<PathBuf>),
    InputMissing(PathBuf),
    TargetMissing(PathBuf),
    /// Reading the previous record failed.
    StoreUnavailable(String),
    /// Digesting an existing file dependency failed.
    FingerprintFailed(String),
    /// Reads files that a stale task earlier in the order will regenerate.
    UpstreamStale {
        producer: TaskName,
        paths: Vec<PathBuf>,
    },
}

impl StaleReason {
    /// Whether this classification carries a per-task error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StaleReason::StoreUnavailable(_) | StaleReason::FingerprintFailed(_)
        )
    }
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NeverRun => f.write_str("never run"),
            StaleReason::InputsChanged(paths) => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "inputs changed: {}", paths.join(", "))
            }
            StaleReason::InputMissing(p) => write!(f, "input missing: {}", p.display()),
            StaleReason::TargetMissing(p) => write!(f, "target missing: {}", p.display()),
            StaleReason::StoreUnavailable(e) => write!(f, "state store unavailable: {}", e),
            StaleReason::FingerprintFailed(e) => write!(f, "fingerprint failed: {}", e),
            StaleReason::UpstreamStale { producer, paths } => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "inputs regenerated by '{}': {}", producer, paths.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Current,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

/// A task selected for execution, with the reason it was selected.
#[derive(Debug, Clone)]
pub struct StaleTask<'a> {
    pub task: &'a Task,
    pub reason: StaleReason,
}

/// Compares tasks against their last committed fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct BuildCache<'fs> {
    fs: &'fs dyn FileSystem,
    parallel: bool,
}

impl<'fs> BuildCache<'fs> {
    pub fn new(fs: &'fs dyn FileSystem) -> Self {
        Self {
            fs,
            parallel: false,
        }
    }

    /// Hash the file sets of all tasks on the rayon pool in
    /// [`filter_tasks`](Self::filter_tasks). Store access stays sequential.
    pub fn with_parallel_fingerprint(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Snapshot the current state of `task`'s file dependencies.
    pub fn fingerprint(&self, task: &Task) -> Result<Fingerprint> {
        Fingerprint::compute(task, self.fs)
    }

    /// Classify a single task against its persisted record.
    pub fn is_stale(&self, task: &Task, store: &dyn StateStore) -> Staleness {
        self.classify(task, store, None)
    }

    /// Keep only the stale tasks of `ordered`, preserving their relative order.
    pub fn filter_tasks<'a>(
        &self,
        ordered: &[&'a Task],
        store: &dyn StateStore,
    ) -> Vec<StaleTask<'a>> {
        let precomputed: Vec<Option<Result<Fingerprint>>> = if self.parallel && ordered.len() > 1 {
            ordered
                .par_iter()
                .map(|task| Some(self.fingerprint(task)))
                .collect()
        } else {
            ordered.iter().map(|_| None).collect()
        };

        // Targets of tasks selected so far, mapped to their producer.
        let mut regenerated: HashMap<&Path, &str> = HashMap::new();
        let mut stale = Vec::new();
        for (&task, current) in ordered.iter().zip(precomputed) {
            let reason = match self.classify(task, store, current) {
                Staleness::Stale(reason) => reason,
                Staleness::Current => match upstream_reason(task, &regenerated) {
                    Some(reason) => {
                        debug!(task = %task.name, %reason, "task stale");
                        reason
                    }
                    None => continue,
                },
            };
            for target in task.targets.iter() {
                regenerated.insert(target.as_path(), task.name.as_str());
            }
            stale.push(StaleTask { task, reason });
        }

        info!(
            total = ordered.len(),
            stale = stale.len(),
            "classified tasks"
        );
        stale
    }

    /// Record the current fingerprint of `task` after it ran successfully.
    ///
    /// Only call this for tasks that were actually executed.
    pub fn commit(&self, task: &Task, store: &mut dyn StateStore) -> Result<Fingerprint> {
        let fingerprint = self.fingerprint(task)?;
        store.set(&task.name, &fingerprint)?;
        debug!(task = %task.name, files = fingerprint.digests.len(), "committed fingerprint");
        Ok(fingerprint)
    }

    fn classify(
        &self,
        task: &Task,
        store: &dyn StateStore,
        current: Option<Result<Fingerprint>>,
    ) -> Staleness {
        let staleness = match self.check(task, store, current) {
            Some(reason) => Staleness::Stale(reason),
            None => Staleness::Current,
        };
        match &staleness {
            Staleness::Stale(reason) if reason.is_error() => {
                warn!(task = %task.name, %reason, "task stale due to error")
            }
            Staleness::Stale(reason) => debug!(task = %task.name, %reason, "task stale"),
            Staleness::Current => debug!(task = %task.name, "task up to date"),
        }
        staleness
    }

    fn check(
        &self,
        task: &Task,
        store: &dyn StateStore,
        current: Option<Result<Fingerprint>>,
    ) -> Option<StaleReason> {
        let previous = match store.get(&task.name) {
            Ok(Some(previous)) => previous,
            Ok(None) => return Some(StaleReason::NeverRun),
            Err(err) => return Some(StaleReason::StoreUnavailable(err.to_string())),
        };

        let current = match current.unwrap_or_else(|| self.fingerprint(task)) {
            Ok(current) => current,
            Err(err) => return Some(StaleReason::FingerprintFailed(err.to_string())),
        };

        if current != previous {
            return Some(StaleReason::InputsChanged(current.changed_paths(&previous)));
        }

        if let Some(path) = task.file_dep.iter().find(|p| !self.fs.exists(p)) {
            return Some(StaleReason::InputMissing(path.clone()));
        }

        if let Some(path) = task.targets.iter().find(|p| !self.fs.exists(p)) {
            return Some(StaleReason::TargetMissing(path.clone()));
        }

        None
    }
}

/// First producer (in `file_dep` order) among `regenerated` that `task`
/// reads from, with every input of `task` it regenerates.
fn upstream_reason(task: &Task, regenerated: &HashMap<&Path, &str>) -> Option<StaleReason> {
    let producer = task
        .file_dep
        .iter()
        .find_map(|p| regenerated.get(p.as_path()).copied())?;
    let paths = task
        .file_dep
        .iter()
        .filter(|p| regenerated.get(p.as_path()) == Some(&producer))
        .cloned()
        .collect();
    Some(StaleReason::UpstreamStale {
        producer: producer.to_string(),
        paths,
    })
}
