//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static TRACING_INIT: Once = Once::new();

/// Installs a stderr subscriber.
///
/// Call this once at startup. Safe to call multiple times; only the first
/// call has an effect. Without `verbose`, nothing is installed unless
/// `RUST_LOG` is set (e.g. `RUST_LOG=proreader_language=trace`). With
/// `verbose`, `debug` is the default level for the proreader crates.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) if verbose => EnvFilter::new("proreader_language=debug,proreader_runtime=debug,proreader=debug"),
            Err(_) => return,
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .with(filter)
            .init();
    });
}
