// src/dag/mod.rs

//! Task registry, dependency graph and topological scheduling.
//!
//! - [`task`] holds the declared tasks for one run.
//! - [`graph`] validates a registry and builds the dependency graph from both
//!   explicit `task_dep` ordering and implicit file relationships.
//! - [`scheduler`] turns the graph into a deterministic execution order.

pub mod graph;
pub mod scheduler;
pub mod task;
mod validate;

pub use graph::{DependencyGraph, EdgeKind, GraphNode};
pub use scheduler::{sort, sort_all, sort_for_task};
pub use task::{Task, TaskRegistry};
