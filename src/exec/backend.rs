// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The run loop in `lib.rs` talks to an [`Executor`] instead of spawning
//! processes itself, so tests can record which tasks ran without touching
//! the shell.

use crate::dag::Task;
use crate::types::TaskOutcome;

/// Performs a task's work once the scheduler selected it.
pub trait Executor {
    fn execute(&mut self, task: &Task) -> TaskOutcome;
}
