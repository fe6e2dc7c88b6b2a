pub mod builders;
pub mod fake_executor;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test subscriber for dagmake's `tracing` output.
///
/// Scheduling, cache classification and store writes log through `tracing`;
/// this routes those events to the per-test capture buffer, so they show up
/// only for failing tests (or with `-- --nocapture`).
///
/// Reads `RUST_LOG` rather than `DAGMAKE_LOG`, e.g.
/// `RUST_LOG=dagmake::cache=debug cargo test`. Defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}
