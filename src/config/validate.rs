// src/config/validate.rs

//! Config-level sanity checks.
//!
//! Graph invariants (unique targets, resolvable inputs, cycles) are checked
//! by [`DependencyGraph::build`](crate::dag::DependencyGraph::build) and the
//! scheduler, not here.

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagmakeError, Result};
use crate::types::StoreMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagmakeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_commands(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagmakeError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.store == StoreMode::File && cfg.config.state_file.trim().is_empty() {
        return Err(DagmakeError::ConfigError(
            "[config].state_file must not be empty when store = \"file\"".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if let Some(cmd) = &task.cmd {
            if cmd.trim().is_empty() {
                return Err(DagmakeError::ConfigError(format!(
                    "task '{}' has an empty `cmd`; omit it for tasks without an action",
                    name
                )));
            }
        }
    }
    Ok(())
}
