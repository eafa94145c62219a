//! Structured logging setup.

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the passed default filter. `json_format` switches the
/// fmt layer to JSON output for log aggregation.
pub fn init_tracing(default_level: &str, json_format: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = Registry::default().with(env_filter);

    if json_format {
        registry
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    } else {
        registry
            .with(fmt::layer())
            .try_init()
            .context("Failed to initialize tracing subscriber")?;
    }

    Ok(())
}

/// Best-effort init for tests; repeated calls are fine.
pub fn init_test_tracing() {
    let _ = init_tracing("debug", false);
}
