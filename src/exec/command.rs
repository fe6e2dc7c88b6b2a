// src/exec/command.rs

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::dag::Task;
use crate::exec::backend::Executor;
use crate::types::TaskOutcome;

/// Runs each task's `action` through the platform shell, inheriting stdout
/// and stderr. Tasks without an action succeed immediately.
///
/// An empty `cwd` means the current working directory.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    cwd: PathBuf,
}

impl ShellExecutor {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl Executor for ShellExecutor {
    fn execute(&mut self, task: &Task) -> TaskOutcome {
        let Some(cmd) = task.action.as_deref() else {
            debug!(task = %task.name, "task has no action; nothing to run");
            return TaskOutcome::Success;
        };
        match run_shell(&task.name, cmd, &self.cwd) {
            Ok(outcome) => outcome,
            Err(err) => {
                // Spawn/wait failures are reported as a failed run.
                error!(task = %task.name, error = %err, "task execution error");
                TaskOutcome::Failed(-1)
            }
        }
    }
}

fn run_shell(name: &str, cmd: &str, cwd: &Path) -> Result<TaskOutcome> {
    info!(task = %name, cmd = %cmd, "starting task process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    if !cwd.as_os_str().is_empty() {
        command.current_dir(cwd);
    }
    let status = command
        .stdin(Stdio::null())
        .status()
        .with_context(|| format!("spawning process for task '{}'", name))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %name,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_to_outcomes() {
        let mut exec = ShellExecutor::new(".");
        assert_eq!(exec.execute(&Task::new("ok").action("true")), TaskOutcome::Success);
        assert_eq!(
            exec.execute(&Task::new("bad").action("exit 3")),
            TaskOutcome::Failed(3)
        );
        assert_eq!(exec.execute(&Task::new("phony")), TaskOutcome::Success);
    }
}
