#![allow(dead_code)]

use std::collections::BTreeMap;

use dagmake::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use dagmake::dag::{Task, TaskRegistry};
use dagmake::types::StoreMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_memory_store(mut self) -> Self {
        self.config.config.store = StoreMode::Memory;
        self
    }

    pub fn with_state_file(mut self, path: &str) -> Self {
        self.config.config.state_file = path.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// A task without a command.
    pub fn group() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn file_dep(mut self, path: &str) -> Self {
        self.task.file_dep.push(path.to_string());
        self
    }

    pub fn target(mut self, path: &str) -> Self {
        self.task.targets.push(path.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.task_dep.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Collects tasks in declaration order into a `TaskRegistry`.
#[derive(Default)]
pub struct RegistryBuilder {
    tasks: Vec<Task>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// `name` reads `inputs` and writes `outputs`.
    pub fn producer(self, name: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        let task = inputs.iter().fold(Task::new(name), |t, p| t.file_dep(*p));
        let task = outputs.iter().fold(task, |t, p| t.target(*p));
        self.task(task.action(format!("build {name}")))
    }

    pub fn build(self) -> TaskRegistry {
        TaskRegistry::new(self.tasks)
    }
}
