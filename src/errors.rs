// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Configuration errors describe a logically inconsistent task set and halt a
//! run before anything executes. Fingerprint and store errors are surfaced per
//! task by the build cache instead of aborting the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum DagmakeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("task at position {index} has an empty name")]
    EmptyTaskName { index: usize },

    #[error("duplicate task name: {0}")]
    DuplicateTask(TaskName),

    #[error("tasks '{first}' and '{second}' share target(s): {}", display_paths(.paths))]
    TargetConflict {
        first: TaskName,
        second: TaskName,
        paths: Vec<PathBuf>,
    },

    #[error("path {path:?} is a dependency of task '{task}' and is missing")]
    MissingDependency { task: TaskName, path: PathBuf },

    #[error("task '{task}' depends on unknown task '{dep}'")]
    UnknownTaskDependency { task: TaskName, dep: TaskName },

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("failed to fingerprint {path:?}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("state store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DagmakeError {
    /// Whether this error describes an inconsistent task set (fatal, never
    /// retried) rather than a runtime I/O or store failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DagmakeError::ConfigError(_)
                | DagmakeError::EmptyTaskName { .. }
                | DagmakeError::DuplicateTask(_)
                | DagmakeError::TargetConflict { .. }
                | DagmakeError::MissingDependency { .. }
                | DagmakeError::UnknownTaskDependency { .. }
                | DagmakeError::DagCycle(_)
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagmakeError>;
