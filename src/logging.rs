//! Diagnostics go to stderr; stdout carries only the status line.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ENERGY_STATUSLINE_LOG";

fn default_directive(debug: bool) -> &'static str {
    if debug { "energy_statusline=debug" } else { "off" }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
