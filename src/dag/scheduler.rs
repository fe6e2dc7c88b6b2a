// src/dag/scheduler.rs

//! Deterministic topological ordering of a [`DependencyGraph`].
//!
//! The sort is an iterative depth-first search emitting nodes in post-order:
//! a task is emitted only after all of its prerequisites have been emitted.
//! Outgoing neighbours are visited in ascending node order, and node order
//! follows task declaration order, so identical inputs always produce the
//! same schedule.
//!
//! A back edge to a node still on the DFS stack is a cycle; it is reported
//! with the full path and the sort stops. The sort never returns a partial
//! order.

use petgraph::graph::NodeIndex;
use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::task::TaskRegistry;
use crate::errors::{DagmakeError, Result};
use crate::types::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

struct Frame {
    node: NodeIndex,
    neighbors: Vec<NodeIndex>,
    next: usize,
}

/// Order every task reachable from `start` so that prerequisites come before
/// the tasks that need them. The root itself is never part of the output.
pub fn sort(graph: &DependencyGraph, start: NodeIndex) -> Result<Vec<TaskId>> {
    let inner = graph.inner();
    let mut marks = vec![Mark::Unvisited; inner.node_count()];
    let mut order = Vec::with_capacity(graph.task_count());

    let Some(start_mark) = marks.get_mut(start.index()) else {
        return Err(DagmakeError::ConfigError(format!(
            "sort start node {} is not part of the graph",
            start.index()
        )));
    };
    *start_mark = Mark::OnStack;
    let mut stack = vec![frame(graph, start)];

    while let Some(top) = stack.last_mut() {
        if let Some(&next) = top.neighbors.get(top.next) {
            top.next += 1;
            match marks[next.index()] {
                Mark::Done => {}
                Mark::OnStack => {
                    let err = cycle_error(graph, &stack, next);
                    warn!(error = %err, "topological sort aborted");
                    return Err(err);
                }
                Mark::Unvisited => {
                    marks[next.index()] = Mark::OnStack;
                    stack.push(frame(graph, next));
                }
            }
        } else {
            let node = top.node;
            stack.pop();
            marks[node.index()] = Mark::Done;
            if let Some(id) = graph.task_of(node) {
                order.push(id);
            }
        }
    }

    debug!(scheduled = order.len(), "topological sort complete");
    Ok(order)
}

/// Order the whole graph, starting at the synthetic root.
pub fn sort_all(graph: &DependencyGraph) -> Result<Vec<TaskId>> {
    sort(graph, graph.root())
}

/// Order only `task` and its transitive prerequisites.
pub fn sort_for_task(
    graph: &DependencyGraph,
    registry: &TaskRegistry,
    task: &str,
) -> Result<Vec<TaskId>> {
    let node = registry
        .find(task)
        .and_then(|(id, _)| graph.node_of(id))
        .ok_or_else(|| DagmakeError::ConfigError(format!("unknown task '{}'", task)))?;
    sort(graph, node)
}

fn frame(graph: &DependencyGraph, node: NodeIndex) -> Frame {
    let mut neighbors: Vec<NodeIndex> = graph.inner().neighbors(node).collect();
    neighbors.sort();
    neighbors.dedup();
    Frame {
        node,
        neighbors,
        next: 0,
    }
}

/// Render the cycle closed by the back edge `stack.top -> back_to`.
fn cycle_error(graph: &DependencyGraph, stack: &[Frame], back_to: NodeIndex) -> DagmakeError {
    let start = stack
        .iter()
        .position(|f| f.node == back_to)
        .unwrap_or(0);
    let mut path: Vec<String> = stack[start..]
        .iter()
        .map(|f| node_label(graph, f.node))
        .collect();
    path.push(node_label(graph, back_to));

    DagmakeError::DagCycle(format!(
        "cycle detected in task DAG: {}",
        path.join(" -> ")
    ))
}

fn node_label(graph: &DependencyGraph, node: NodeIndex) -> String {
    match graph.task_of(node) {
        Some(id) => graph
            .name_of(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string()),
        None => "<root>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::Task;
    use crate::fs::mock::MockFileSystem;

    fn order_names(tasks: Vec<Task>) -> Result<Vec<String>> {
        let reg = TaskRegistry::new(tasks);
        let graph = DependencyGraph::build(&reg, &MockFileSystem::new())?;
        let order = sort_all(&graph)?;
        Ok(reg.resolve(&order).map(|t| t.name.clone()).collect())
    }

    #[test]
    fn independent_tasks_keep_declaration_order() {
        let order = order_names(vec![Task::new("c"), Task::new("a"), Task::new("b")]).unwrap();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn producers_run_before_consumers() {
        let order = order_names(vec![
            Task::new("link").file_dep("main.o"),
            Task::new("compile").target("main.o").after("gen"),
            Task::new("gen"),
        ])
        .unwrap();
        assert_eq!(order, vec!["gen", "compile", "link"]);
    }

    #[test]
    fn cycle_reports_path() {
        let err = order_names(vec![
            Task::new("A").after("B"),
            Task::new("B").after("C"),
            Task::new("C").after("A"),
        ])
        .unwrap_err();
        match err {
            DagmakeError::DagCycle(msg) => {
                assert!(msg.contains("A -> B -> C -> A"), "unexpected message: {msg}");
            }
            other => panic!("expected DagCycle, got {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = order_names(vec![Task::new("A").target("x").file_dep("x")]).unwrap_err();
        assert!(matches!(err, DagmakeError::DagCycle(_)));
    }

    #[test]
    fn sort_for_task_limits_to_prerequisites() {
        let reg = TaskRegistry::new(vec![
            Task::new("docs"),
            Task::new("build").after("fetch"),
            Task::new("fetch"),
        ]);
        let graph = DependencyGraph::build(&reg, &MockFileSystem::new()).unwrap();
        let order = sort_for_task(&graph, &reg, "build").unwrap();
        let names: Vec<_> = reg.resolve(&order).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "build"]);

        assert!(sort_for_task(&graph, &reg, "nope").is_err());
    }
}
