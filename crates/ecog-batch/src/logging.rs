//! Tracing subscriber setup for the batch binary

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber; `RUST_LOG` overrides the `info` default.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(build_env_filter())
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
