// src/dag/task.rs

//! Task definitions and the registry that owns them for one run.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::{TaskId, TaskName};

/// A named unit of work with file inputs, file outputs and explicit ordering
/// dependencies on other tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    /// Files this task reads before running.
    pub file_dep: BTreeSet<PathBuf>,
    /// Files this task produces. Exclusively owned by this task.
    pub targets: BTreeSet<PathBuf>,
    /// Tasks that must complete strictly before this one.
    pub task_dep: BTreeSet<TaskName>,
    /// Shell command run by the execution layer. Opaque to scheduling.
    pub action: Option<String>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            file_dep: BTreeSet::new(),
            targets: BTreeSet::new(),
            task_dep: BTreeSet::new(),
            action: None,
        }
    }

    pub fn file_dep(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_dep.insert(path.into());
        self
    }

    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets.insert(path.into());
        self
    }

    pub fn after(mut self, task: impl Into<TaskName>) -> Self {
        self.task_dep.insert(task.into());
        self
    }

    pub fn action(mut self, cmd: impl Into<String>) -> Self {
        self.action = Some(cmd.into());
        self
    }
}

/// Immutable, ordered collection of the tasks declared for one run.
///
/// The registry does not validate anything; name uniqueness and the other
/// invariants are checked by [`DependencyGraph::build`](super::DependencyGraph::build).
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    /// First task declared under `name`.
    pub fn find(&self, name: &str) -> Option<(TaskId, &Task)> {
        self.iter().find(|(_, t)| t.name == name)
    }

    /// Tasks in declaration order, paired with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks.iter().enumerate().map(|(i, t)| (TaskId(i), t))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Resolve a list of ids (e.g. a schedule) back to tasks.
    ///
    /// Ids that do not belong to this registry are skipped.
    /// The returned tasks borrow only the registry, not `ids`.
    pub fn resolve<'r, 'i>(&'r self, ids: &'i [TaskId]) -> impl Iterator<Item = &'r Task> + 'i
    where
        'r: 'i,
    {
        ids.iter().filter_map(move |id| self.get(*id))
    }
}

impl FromIterator<Task> for TaskRegistry {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
