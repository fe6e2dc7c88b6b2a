// src/dag/graph.rs

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::dag::task::TaskRegistry;
use crate::dag::validate::validate_registry;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{TaskId, TaskName};

/// Node weight: either the synthetic root or a task from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNode {
    Root,
    Task(TaskId),
}

/// Why an edge exists. An edge `A -> B` always means "B runs before A".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Root to every task.
    Root,
    /// `B` is listed in `A.task_dep`.
    TaskOrder,
    /// `A` reads a file that `B` produces.
    FileData,
}

/// Directed graph over the tasks of a registry plus one synthetic root.
///
/// Only ever constructed over a validated registry, see [`DependencyGraph::build`].
/// Acyclicity is *not* checked here; that is the scheduler's job.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, EdgeKind>,
    root: NodeIndex,
    /// Node of each task, indexed by `TaskId`.
    nodes: Vec<NodeIndex>,
    names: Vec<TaskName>,
}

impl DependencyGraph {
    /// Validate `registry` and build its dependency graph.
    ///
    /// Fails fast on the first invariant violation; no partial graph is
    /// returned.
    pub fn build(registry: &TaskRegistry, fs: &dyn FileSystem) -> Result<Self> {
        let index = validate_registry(registry, fs)?;

        let mut graph = DiGraph::with_capacity(registry.len() + 1, registry.len() * 2);
        let root = graph.add_node(GraphNode::Root);
        let nodes: Vec<NodeIndex> = registry
            .iter()
            .map(|(id, _)| graph.add_node(GraphNode::Task(id)))
            .collect();

        for node in nodes.iter() {
            graph.add_edge(root, *node, EdgeKind::Root);
        }

        let names = registry.iter().map(|(_, t)| t.name.clone()).collect();
        let mut this = Self {
            graph,
            root,
            nodes,
            names,
        };

        for (id, task) in registry.iter() {
            for dep in task.task_dep.iter() {
                if let Some(&dep_id) = index.by_name.get(dep.as_str()) {
                    this.add_dependency(id, dep_id, EdgeKind::TaskOrder);
                }
            }
            for path in task.file_dep.iter() {
                if let Some(&producer) = index.by_target.get(path.as_path()) {
                    debug!(
                        task = %task.name,
                        path = ?path,
                        producer = %producer,
                        "file dependency on produced target"
                    );
                    this.add_dependency(id, producer, EdgeKind::FileData);
                }
            }
        }

        info!(
            tasks = registry.len(),
            edges = this.graph.edge_count(),
            "dependency graph built"
        );
        Ok(this)
    }

    fn add_dependency(&mut self, from: TaskId, to: TaskId, kind: EdgeKind) {
        let (a, b) = (self.nodes[from.index()], self.nodes[to.index()]);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, kind);
        }
    }

    /// The synthetic root node.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Graph node of a task.
    pub fn node_of(&self, id: TaskId) -> Option<NodeIndex> {
        self.nodes.get(id.index()).copied()
    }

    /// Task behind a graph node; `None` for the root.
    pub fn task_of(&self, node: NodeIndex) -> Option<TaskId> {
        match self.graph.node_weight(node)? {
            GraphNode::Root => None,
            GraphNode::Task(id) => Some(*id),
        }
    }

    pub fn name_of(&self, id: TaskId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn task_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct prerequisites of a task (tasks that must run before it).
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents of a task (tasks that must run after it).
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: TaskId, dir: Direction) -> Vec<TaskId> {
        let Some(node) = self.node_of(id) else {
            return Vec::new();
        };
        let mut out: Vec<TaskId> = self
            .graph
            .neighbors_directed(node, dir)
            .filter_map(|n| self.task_of(n))
            .collect();
        out.sort();
        out
    }

    /// All task-to-task edges as `(dependent, prerequisite, kind)`.
    pub fn edges(&self) -> Vec<(TaskId, TaskId, EdgeKind)> {
        self.graph
            .edge_references()
            .filter_map(|e| {
                let from = self.task_of(e.source())?;
                let to = self.task_of(e.target())?;
                Some((from, to, *e.weight()))
            })
            .collect()
    }

    /// Underlying petgraph graph.
    pub fn inner(&self) -> &DiGraph<GraphNode, EdgeKind> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::task::Task;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn root_reaches_every_task() {
        let reg = TaskRegistry::new(vec![Task::new("A"), Task::new("B")]);
        let g = DependencyGraph::build(&reg, &MockFileSystem::new()).unwrap();

        let from_root: Vec<_> = g
            .inner()
            .neighbors(g.root())
            .filter_map(|n| g.task_of(n))
            .collect();
        assert_eq!(from_root.len(), 2);
        assert!(g.edges().is_empty());
    }

    #[test]
    fn file_and_task_edges_point_at_prerequisites() {
        let fs = MockFileSystem::new();
        fs.add_file("f2", "x");
        let reg = TaskRegistry::new(vec![
            Task::new("A").file_dep("f1").file_dep("f2"),
            Task::new("B").target("f1"),
            Task::new("C").target("f3").after("A"),
        ]);
        let g = DependencyGraph::build(&reg, &fs).unwrap();

        let mut edges = g.edges();
        edges.sort_by_key(|(a, b, _)| (*a, *b));
        assert_eq!(
            edges,
            vec![
                (TaskId(0), TaskId(1), EdgeKind::FileData),
                (TaskId(2), TaskId(0), EdgeKind::TaskOrder),
            ]
        );
        assert_eq!(g.dependencies_of(TaskId(0)), vec![TaskId(1)]);
        assert_eq!(g.dependents_of(TaskId(0)), vec![TaskId(2)]);
    }

    #[test]
    fn duplicate_relations_collapse_into_one_edge() {
        let reg = TaskRegistry::new(vec![
            Task::new("A").file_dep("out").after("B"),
            Task::new("B").target("out"),
        ]);
        let g = DependencyGraph::build(&reg, &MockFileSystem::new()).unwrap();
        assert_eq!(g.edges().len(), 1);
    }
}
