// src/exec/mod.rs

//! Execution collaborator.
//!
//! The scheduling core never runs a task itself; the binary hands the stale
//! tasks to an [`Executor`] one by one and commits each fingerprint only after
//! a successful outcome.
//!
//! - [`backend`] provides the `Executor` trait that tests replace.
//! - [`command`] provides `ShellExecutor`, which runs `cmd` via the shell.

pub mod backend;
pub mod command;

pub use backend::Executor;
pub use command::ShellExecutor;
