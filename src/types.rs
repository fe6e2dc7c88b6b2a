// src/types.rs

//! Small shared types used across the DAG, cache and execution layers.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Task names are plain strings; they key graph nodes and persisted records.
pub type TaskName = String;

/// Position of a task inside a [`TaskRegistry`](crate::dag::TaskRegistry).
///
/// Ids are dense and follow declaration order, which makes them a convenient
/// deterministic tie-breaker for the topological sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of executing a task's action, as reported by the execution
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit code, or -1 when the process could not be spawned or
    /// was killed by a signal.
    Failed(i32),
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Where task fingerprints are persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// JSON state file on disk (`[config].state_file`).
    #[default]
    File,
    /// In-memory only; every task is stale on the next process start.
    Memory,
}

/// When the file store makes writes durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Rewrite and fsync the state file on every committed record.
    #[default]
    Sync,
    /// Keep writes in memory and persist on `flush`/`close`/drop.
    Relaxed,
}

impl FromStr for Durability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" => Ok(Durability::Sync),
            "relaxed" => Ok(Durability::Relaxed),
            other => Err(format!(
                "invalid durability: {other} (expected \"sync\" or \"relaxed\")"
            )),
        }
    }
}
