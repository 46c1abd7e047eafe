use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

/// Component-scoped log helpers for forms and boards
pub struct Logger;

impl Logger {
    pub fn debug_with_component(component: &str, message: &str) {
        debug!(component, "{}", message);
    }

    pub fn info_with_component(component: &str, message: &str) {
        info!(component, "{}", message);
    }

    pub fn warn_with_component(component: &str, message: &str) {
        warn!(component, "{}", message);
    }

    pub fn error_with_component(component: &str, message: &str) {
        error!(component, "{}", message);
    }
}
