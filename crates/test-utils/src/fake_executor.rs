use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dagmake::dag::Task;
use dagmake::exec::Executor;
use dagmake::fs::FileSystem;
use dagmake::fs::mock::MockFileSystem;
use dagmake::types::TaskOutcome;

/// A fake executor that:
/// - records which tasks were "run", in order
/// - writes each task's targets into a `MockFileSystem`, if one is attached
/// - fails the tasks registered with `fail_task`.
#[derive(Default)]
pub struct RecordingExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failures: HashMap<String, i32>,
    outputs: HashMap<String, Vec<u8>>,
    fs: Option<MockFileSystem>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write targets into `fs` on every successful run. By default the
    /// content is `"<task> output"`.
    pub fn with_fs(mut self, fs: MockFileSystem) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Content written to the targets of `task`.
    pub fn with_output(mut self, task: &str, content: impl Into<Vec<u8>>) -> Self {
        self.outputs.insert(task.to_string(), content.into());
        self
    }

    pub fn fail_task(mut self, task: &str, code: i32) -> Self {
        self.failures.insert(task.to_string(), code);
        self
    }

    /// Shared handle to the list of executed task names.
    pub fn executed_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.executed.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&mut self, task: &Task) -> TaskOutcome {
        self.executed.lock().unwrap().push(task.name.clone());

        if let Some(code) = self.failures.get(&task.name) {
            return TaskOutcome::Failed(*code);
        }

        if let Some(fs) = &self.fs {
            let content = self
                .outputs
                .get(&task.name)
                .cloned()
                .unwrap_or_else(|| format!("{} output", task.name).into_bytes());
            for target in &task.targets {
                if let Err(err) = fs.write(target, &content) {
                    panic!("mock write of {:?} failed: {err}", target);
                }
            }
        }

        TaskOutcome::Success
    }
}
