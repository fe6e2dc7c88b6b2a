// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::store::DEFAULT_STATE_FILE;
use crate::dag::{Task, TaskRegistry};
use crate::types::{Durability, StoreMode};

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// state_file = ".dagmake/state.json"
/// durability = "sync"
///
/// [task.compile]
/// cmd = "cc -c main.c -o main.o"
/// file_dep = ["main.c"]
/// targets = ["main.o"]
///
/// [task.link]
/// cmd = "cc main.o -o app"
/// file_dep = ["main.o"]
/// targets = ["app"]
/// task_dep = ["compile"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A configuration that passed the checks in `validate.rs`.
///
/// Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    /// Build the task registry, resolving relative paths against `root`.
    ///
    /// Tasks are registered in key order, which is the tie-break order used
    /// by the scheduler.
    pub fn registry(&self, root: &Path) -> TaskRegistry {
        self.task
            .iter()
            .map(|(name, tc)| tc.to_task(name, root))
            .collect()
    }

    /// Location of the state file, resolved against `root`.
    pub fn state_file(&self, root: &Path) -> PathBuf {
        resolve(root, &self.config.state_file)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub store: StoreMode,

    /// Path of the JSON state file used when `store = "file"`.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// `"sync"` (default): fsync on every commit. `"relaxed"`: write on close.
    #[serde(default)]
    pub durability: Durability,

    /// Hash each task's file set in parallel while classifying.
    #[serde(default = "default_parallel_fingerprint")]
    pub parallel_fingerprint: bool,
}

fn default_state_file() -> String {
    DEFAULT_STATE_FILE.to_string()
}

fn default_parallel_fingerprint() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            store: StoreMode::default(),
            state_file: default_state_file(),
            durability: Durability::default(),
            parallel_fingerprint: default_parallel_fingerprint(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute. Tasks without a command only order and
    /// group other tasks.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Files read by the task.
    #[serde(default)]
    pub file_dep: Vec<String>,

    /// Files produced by the task.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Tasks that must complete before this one.
    #[serde(default)]
    pub task_dep: Vec<String>,
}

impl TaskConfig {
    pub fn to_task(&self, name: &str, root: &Path) -> Task {
        let mut task = Task::new(name);
        task.file_dep = self.file_dep.iter().map(|p| resolve(root, p)).collect();
        task.targets = self.targets.iter().map(|p| resolve(root, p)).collect();
        task.task_dep = self.task_dep.iter().cloned().collect();
        task.action = self.cmd.clone();
        task
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() || root.as_os_str().is_empty() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_root() {
        let tc = TaskConfig {
            cmd: Some("true".into()),
            file_dep: vec!["src/a.c".into()],
            targets: vec!["/abs/out".into()],
            task_dep: vec!["gen".into()],
        };
        let task = tc.to_task("build", Path::new("proj"));

        assert!(task.file_dep.contains(Path::new("proj/src/a.c")));
        assert!(task.targets.contains(Path::new("/abs/out")));
        assert!(task.task_dep.contains("gen"));
        assert_eq!(task.action.as_deref(), Some("true"));
    }

    #[test]
    fn defaults_apply_to_empty_config_section() {
        let raw: RawConfigFile = toml::from_str("[task.a]\n").unwrap();
        assert_eq!(raw.config.state_file, DEFAULT_STATE_FILE);
        assert_eq!(raw.config.store, StoreMode::File);
        assert_eq!(raw.config.durability, Durability::Sync);
        assert!(raw.config.parallel_fingerprint);
        assert!(raw.task["a"].cmd.is_none());
    }
}
