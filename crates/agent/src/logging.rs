//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` fmt subscriber for the process.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` or `info`.
/// Calling this again after a subscriber is installed does nothing.
pub fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .try_init();
}
