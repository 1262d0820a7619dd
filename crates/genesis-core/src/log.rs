//! Logging system for Genesis.
//!
//! Thin wrapper over tracing-subscriber; the CLI calls this once at
//! startup, library crates only emit `tracing` events.

use genesis_types::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging system with default configuration.
///
/// Respects `RUST_LOG`; defaults to `genesis=info`.
pub fn init_default() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("genesis=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
