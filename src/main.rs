use anyhow::Result;
use peramos_bot::Bot;
use peramos_core::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    peramos_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    tracing::info!(
        station = %config.station.url,
        cache_ttl_secs = config.cache.ttl_secs,
        max_attempts = config.retry.max_attempts,
        "Starting Peramos weather bot"
    );

    let bot = match Bot::connect(&config).await {
        Ok(bot) => bot,
        Err(e) => {
            tracing::error!("Failed to start bot: {} ({})", e, e.user_message());
            return Err(e.into());
        }
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    bot.run(shutdown).await?;

    Ok(())
}
