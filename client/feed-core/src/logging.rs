//! Tracing subscriber bootstrap
//!
//! Hosts embedding the feed client call [`init_tracing`] once at startup.
//! Calling it again is harmless.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. Returns `false` when one was already set.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(json = config.json, "Tracing initialized");
    }
    installed
}
