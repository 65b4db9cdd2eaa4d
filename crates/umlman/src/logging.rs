use std::io;

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over `debug`.
/// Does nothing when a global subscriber is already set.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
