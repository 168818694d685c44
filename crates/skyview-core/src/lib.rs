//! Shared configuration, error types and logging setup for Skyview.

pub mod config;
pub mod error;

pub use config::{
    Config, FavoritesConfig, SearchConfig, Units, ValidationResult, WeatherConfig,
    DEFAULT_MATCH_TOLERANCE,
};
pub use error::{AppError, ConfigError, NetworkError, StorageError, WeatherError};

use anyhow::Result;

/// Filter used when `RUST_LOG` is unset. HTTP internals stay quiet.
const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    tracing::info!("Skyview core initialized");
    Ok(())
}
