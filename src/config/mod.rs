// src/config/mod.rs

//! Task-file loading and validation.
//!
//! - `model.rs` defines the TOML-backed data model.
//! - `loader.rs` reads a config file from disk.
//! - `validate.rs` checks config-level invariants.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
