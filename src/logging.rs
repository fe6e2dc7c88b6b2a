// src/logging.rs

//! Logging setup for `dagmake` using `tracing` + `tracing-subscriber`.
//!
//! The filter is picked in this order:
//! 1. `--log-level` CLI flag
//! 2. `DAGMAKE_LOG` environment variable, either a bare level ("debug") or a
//!    full directive ("dagmake::cache=trace,info")
//! 3. `info`
//!
//! Logs go to stderr so stdout stays free for task output and `--list` /
//! `--dry-run` listings.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "DAGMAKE_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_directive(lvl)),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_filter(&s))
            .unwrap_or_else(|| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    Ok(())
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_filter(s: &str) -> Option<EnvFilter> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let directive = match s.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        _ => s.to_string(),
    };
    EnvFilter::try_new(directive).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_levels_and_directives() {
        assert!(parse_filter("debug").is_some());
        assert!(parse_filter("Warning").is_some());
        assert!(parse_filter("dagmake::cache=trace,info").is_some());
        assert!(parse_filter("   ").is_none());
    }
}
