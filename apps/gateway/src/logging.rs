//! Logging initialization.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber from configuration.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching config files.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {e}", config.level))?;

    if config.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;
    } else {
        fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))?;
    }
    Ok(())
}
