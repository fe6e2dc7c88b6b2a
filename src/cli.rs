// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Durability;

/// Command-line arguments for `dagmake`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagmake",
    version,
    about = "Run only the tasks whose inputs or outputs changed, in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    ///
    /// Relative task paths resolve against the directory of this file.
    #[arg(long, value_name = "PATH", default_value = "Dagmake.toml")]
    pub config: String,

    /// Run only this task and its transitive prerequisites.
    #[arg(long, value_name = "NAME")]
    pub task: Option<String>,

    /// Print the execution order and the stale tasks without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the declared tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Override `[config].durability` (sync, relaxed).
    #[arg(long, value_name = "MODE")]
    pub durability: Option<Durability>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGMAKE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "dagmake",
            "--config",
            "build/Dagmake.toml",
            "--task",
            "link",
            "--dry-run",
            "--durability",
            "relaxed",
        ])
        .unwrap();
        assert_eq!(args.config, "build/Dagmake.toml");
        assert_eq!(args.task.as_deref(), Some("link"));
        assert!(args.dry_run);
        assert_eq!(args.durability, Some(Durability::Relaxed));
    }

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["dagmake"]).unwrap();
        assert_eq!(args.config, "Dagmake.toml");
        assert!(!args.dry_run && !args.list);
        assert!(args.log_level.is_none());
    }
}
