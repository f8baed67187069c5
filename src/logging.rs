//! Tracing subscriber setup for binaries and tools embedding bucket-sync

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a compact stderr subscriber filtered by `RUST_LOG` (default `info`)
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
