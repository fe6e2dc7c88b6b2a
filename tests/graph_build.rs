use std::path::PathBuf;

use dagmake::dag::{DependencyGraph, EdgeKind, Task, TaskRegistry, sort_all};
use dagmake::errors::DagmakeError;
use dagmake::fs::mock::MockFileSystem;
use dagmake::types::TaskId;
use dagmake_test_utils::builders::RegistryBuilder;
use dagmake_test_utils::init_tracing;

fn names(registry: &TaskRegistry, order: &[TaskId]) -> Vec<String> {
    registry.resolve(order).map(|t| t.name.clone()).collect()
}

#[test]
fn producer_is_ordered_before_consumer() {
    init_tracing();

    // A reads f1 and f2; B produces f1; C is unrelated.
    let fs = MockFileSystem::new();
    fs.add_file("f2", "source");
    let registry = RegistryBuilder::new()
        .producer("A", &["f1", "f2"], &[])
        .producer("B", &[], &["f1"])
        .producer("C", &[], &["f3"])
        .build();

    let graph = DependencyGraph::build(&registry, &fs).unwrap();
    let order = names(&registry, &sort_all(&graph).unwrap());

    let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
    assert_eq!(order.len(), 3);
    assert!(pos("B") < pos("A"));
    assert!(order.contains(&"C".to_string()));

    let (a, _) = registry.find("A").unwrap();
    let (b, _) = registry.find("B").unwrap();
    assert!(graph.edges().contains(&(a, b, EdgeKind::FileData)));
}

#[test]
fn unresolvable_input_fails_build() {
    init_tracing();

    let fs = MockFileSystem::new();
    let registry = RegistryBuilder::new()
        .producer("A", &["f1", "f2"], &[])
        .producer("B", &[], &["f1"])
        .build();

    let err = DependencyGraph::build(&registry, &fs).unwrap_err();
    match err {
        DagmakeError::MissingDependency { task, path } => {
            assert_eq!(task, "A");
            assert_eq!(path, PathBuf::from("f2"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn shared_target_names_both_tasks_and_path() {
    init_tracing();

    let fs = MockFileSystem::new();
    let registry = RegistryBuilder::new()
        .producer("X", &[], &["out"])
        .producer("Y", &[], &["out"])
        .build();

    let err = DependencyGraph::build(&registry, &fs).unwrap_err();
    assert!(err.is_configuration());
    let msg = err.to_string();
    assert!(msg.contains("'X'"), "{msg}");
    assert!(msg.contains("'Y'"), "{msg}");
    assert!(msg.contains("out"), "{msg}");
}

#[test]
fn existing_file_satisfies_dependency_without_producer() {
    let fs = MockFileSystem::new();
    fs.add_file("main.c", "int main() {}");
    let registry = RegistryBuilder::new()
        .producer("compile", &["main.c"], &["main.o"])
        .build();

    let graph = DependencyGraph::build(&registry, &fs).unwrap();
    assert!(graph.edges().iter().all(|(_, _, kind)| *kind != EdgeKind::FileData));
}

#[test]
fn task_dep_orders_without_files() {
    let fs = MockFileSystem::new();
    let registry = TaskRegistry::new(vec![
        Task::new("deploy").after("test"),
        Task::new("test").after("build"),
        Task::new("build"),
    ]);

    let graph = DependencyGraph::build(&registry, &fs).unwrap();
    let order = names(&registry, &sort_all(&graph).unwrap());
    assert_eq!(order, vec!["build", "test", "deploy"]);
}

#[test]
fn unknown_task_dep_is_rejected() {
    let fs = MockFileSystem::new();
    let registry = TaskRegistry::new(vec![Task::new("a").after("ghost")]);

    let err = DependencyGraph::build(&registry, &fs).unwrap_err();
    assert!(matches!(
        err,
        DagmakeError::UnknownTaskDependency { ref task, ref dep } if task == "a" && dep == "ghost"
    ));
}

#[test]
fn duplicate_and_empty_names_are_rejected() {
    let fs = MockFileSystem::new();

    let dup = TaskRegistry::new(vec![Task::new("a"), Task::new("a")]);
    assert!(matches!(
        DependencyGraph::build(&dup, &fs),
        Err(DagmakeError::DuplicateTask(name)) if name == "a"
    ));

    let empty = TaskRegistry::new(vec![Task::new("a"), Task::new("")]);
    assert!(matches!(
        DependencyGraph::build(&empty, &fs),
        Err(DagmakeError::EmptyTaskName { index: 1 })
    ));
}

#[test]
fn every_task_hangs_off_the_root() {
    let fs = MockFileSystem::new();
    let registry = TaskRegistry::new(vec![Task::new("a"), Task::new("b").after("a")]);

    let graph = DependencyGraph::build(&registry, &fs).unwrap();
    let root = graph.root();
    assert_eq!(graph.inner().neighbors(root).count(), 2);
    assert_eq!(graph.task_count(), 2);
}

#[test]
fn empty_registry_builds_root_only_graph() {
    let fs = MockFileSystem::new();
    let registry = TaskRegistry::new(Vec::new());

    let graph = DependencyGraph::build(&registry, &fs).unwrap();
    assert_eq!(graph.task_count(), 0);
    assert!(sort_all(&graph).unwrap().is_empty());
}
