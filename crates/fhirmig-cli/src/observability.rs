// Basic tracing initialization for the CLI.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes tracing once, preferring `RUST_LOG` over the given level.
pub fn init_tracing(level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
