//! Logging setup for gymlog.
//!
//! Output goes to stderr so that commands printing JSON on stdout stay
//! machine-readable. RUST_LOG always wins over the requested level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for a `-v` count: 0 → warn, 1 → info, 2+ → debug
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber for the CLI
pub fn init(verbosity: u8) {
    init_with_level(level_for_verbosity(verbosity))
}

/// Install the global subscriber with an explicit default level
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route logs through the test harness; safe to call from every test
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
