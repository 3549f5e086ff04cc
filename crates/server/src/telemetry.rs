//! Tracing subscriber initialization.
//!
//! Installs a [`tracing_subscriber`] registry with an `EnvFilter` and the
//! standard `fmt` layer. `RUST_LOG` wins over the configured level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if set and valid, the configured level otherwise.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Initialize the global tracing subscriber. Call once, before any tracing
/// calls.
pub fn init(config: &LoggingConfig) {
    let fmt_layer = tracing_subscriber::fmt::layer().with_ansi(config.ansi);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .init();
}
