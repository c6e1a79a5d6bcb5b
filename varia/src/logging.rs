//! Tracing initialization for the CLI.

use std::error::Error;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes structured logging.
///
/// Defaults to `info`; `RUST_LOG` overrides.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .try_init()?;

    Ok(())
}
