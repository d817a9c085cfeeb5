pub mod config;
pub mod error;

pub use config::{BotConfig, CacheConfig, Config, RetryConfig, StationConfig, ValidationResult};
pub use error::{
    AppError, ConfigError, FailureCategory, NetworkError, ReqwestErrorExt, TransportError,
};

use anyhow::Result;

/// Initialize logging for the bot process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Peramos core initialized");
    Ok(())
}
