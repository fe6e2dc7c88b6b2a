// src/dag/validate.rs

//! Invariant checks run before any edge is added to the dependency graph.
//!
//! Each check fails fast with its own error variant. The checks run in a
//! fixed order: names, target ownership, dependency resolvability, then task
//! references.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dag::task::TaskRegistry;
use crate::errors::{DagmakeError, Result};
use crate::fs::FileSystem;
use crate::types::TaskId;

/// Lookup tables produced by a successful validation pass.
#[derive(Debug, Default)]
pub(crate) struct TaskIndex<'a> {
    pub by_name: HashMap<&'a str, TaskId>,
    pub by_target: HashMap<&'a Path, TaskId>,
}

pub(crate) fn validate_registry<'a>(
    registry: &'a TaskRegistry,
    fs: &dyn FileSystem,
) -> Result<TaskIndex<'a>> {
    let by_name = index_names(registry)?;
    let by_target = index_targets(registry)?;
    ensure_dependencies_resolvable(registry, &by_target, fs)?;
    ensure_task_dependencies_known(registry, &by_name)?;

    debug!(
        tasks = by_name.len(),
        targets = by_target.len(),
        "task registry validated"
    );
    Ok(TaskIndex { by_name, by_target })
}

fn index_names(registry: &TaskRegistry) -> Result<HashMap<&str, TaskId>> {
    let mut by_name = HashMap::with_capacity(registry.len());
    for (id, task) in registry.iter() {
        if task.name.is_empty() {
            return Err(DagmakeError::EmptyTaskName { index: id.index() });
        }
        if by_name.insert(task.name.as_str(), id).is_some() {
            return Err(DagmakeError::DuplicateTask(task.name.clone()));
        }
    }
    Ok(by_name)
}

/// Map every target to its owning task, rejecting the first pair of tasks
/// (in declaration order) whose target sets intersect.
fn index_targets(registry: &TaskRegistry) -> Result<HashMap<&Path, TaskId>> {
    let mut by_target: HashMap<&Path, TaskId> = HashMap::new();
    for (id, task) in registry.iter() {
        for target in task.targets.iter() {
            if let Some(&owner_id) = by_target.get(target.as_path()) {
                // Validated names above, so both ids resolve.
                let owner = &registry.tasks()[owner_id.index()];
                let paths: Vec<PathBuf> = owner
                    .targets
                    .intersection(&task.targets)
                    .cloned()
                    .collect();
                return Err(DagmakeError::TargetConflict {
                    first: owner.name.clone(),
                    second: task.name.clone(),
                    paths,
                });
            }
            by_target.insert(target.as_path(), id);
        }
    }
    Ok(by_target)
}

/// Every file dependency that no task produces must already exist.
fn ensure_dependencies_resolvable(
    registry: &TaskRegistry,
    by_target: &HashMap<&Path, TaskId>,
    fs: &dyn FileSystem,
) -> Result<()> {
    for (_, task) in registry.iter() {
        for path in task.file_dep.iter() {
            if by_target.contains_key(path.as_path()) {
                continue;
            }
            if !fs.exists(path) {
                return Err(DagmakeError::MissingDependency {
                    task: task.name.clone(),
                    path: path.clone(),
                });
            }
        }
    }
    Ok(())
}

fn ensure_task_dependencies_known(
    registry: &TaskRegistry,
    by_name: &HashMap<&str, TaskId>,
) -> Result<()> {
    for (_, task) in registry.iter() {
        for dep in task.task_dep.iter() {
            if !by_name.contains_key(dep.as_str()) {
                return Err(DagmakeError::UnknownTaskDependency {
                    task: task.name.clone(),
                    dep: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::Task;
    use crate::fs::mock::MockFileSystem;

    fn registry(tasks: Vec<Task>) -> TaskRegistry {
        TaskRegistry::new(tasks)
    }

    #[test]
    fn empty_name_is_rejected() {
        let reg = registry(vec![Task::new("ok"), Task::new("")]);
        let err = validate_registry(&reg, &MockFileSystem::new()).unwrap_err();
        assert!(matches!(err, DagmakeError::EmptyTaskName { index: 1 }));
    }

    #[test]
    fn duplicate_names_checked_before_targets() {
        // Both a duplicate name and a target conflict: the name check wins.
        let reg = registry(vec![
            Task::new("A").target("out"),
            Task::new("A").target("out"),
        ]);
        let err = validate_registry(&reg, &MockFileSystem::new()).unwrap_err();
        assert!(matches!(err, DagmakeError::DuplicateTask(name) if name == "A"));
    }

    #[test]
    fn conflict_reports_every_shared_path() {
        let reg = registry(vec![
            Task::new("X").target("a").target("b").target("c"),
            Task::new("Y").target("c").target("a"),
        ]);
        match validate_registry(&reg, &MockFileSystem::new()) {
            Err(DagmakeError::TargetConflict { first, second, paths }) => {
                assert_eq!(first, "X");
                assert_eq!(second, "Y");
                assert_eq!(paths, vec![PathBuf::from("a"), PathBuf::from("c")]);
            }
            other => panic!("expected TargetConflict, got {:?}", other),
        }
    }

    #[test]
    fn produced_inputs_need_not_exist() {
        let fs = MockFileSystem::new();
        fs.add_file("src.c", "int main;");
        let reg = registry(vec![
            Task::new("link").file_dep("main.o"),
            Task::new("compile").file_dep("src.c").target("main.o"),
        ]);
        let index = validate_registry(&reg, &fs).unwrap();
        assert_eq!(index.by_target.get(Path::new("main.o")), Some(&TaskId(1)));
    }

    #[test]
    fn unknown_task_dependency_is_rejected() {
        let reg = registry(vec![Task::new("A").after("ghost")]);
        let err = validate_registry(&reg, &MockFileSystem::new()).unwrap_err();
        assert!(
            matches!(err, DagmakeError::UnknownTaskDependency { ref task, ref dep } if task == "A" && dep == "ghost")
        );
    }
}
