//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Install a JSON `tracing` subscriber filtered by `service.log_level`.
///
/// An invalid filter directive falls back to `info`. Calling this when a
/// global subscriber is already installed leaves the existing one in place.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.service.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_env_filter(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            "Tracing initialized"
        );
    } else {
        tracing::debug!("Tracing subscriber already installed");
    }

    Ok(())
}

/// Flush and shut down tracing.
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
