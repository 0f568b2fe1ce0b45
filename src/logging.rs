//! Logging setup. Everything goes to stderr: stdout belongs to the
//! JSON-RPC stream.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise `level`.
pub fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level: {level}")),
    }
}

/// Install the global subscriber. Call once, from `main`.
pub fn init(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}
