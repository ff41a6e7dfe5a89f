use std::io::IsTerminal;

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. sqlx reports every statement at
/// `info`, which would bury the run summary.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber. Call once, at startup in main.rs.
///
/// Logs are written to stderr so stdout carries only the report, which
/// keeps `--json` output pipeable.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr = std::io::stderr();

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(stderr.is_terminal())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!(default_filter = DEFAULT_FILTER, "Logging initialized");
}
