use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use fx_signal_bot::bot::SignalBot;
use fx_signal_bot::config::Config;
use fx_signal_bot::core::clock::SystemClock;
use fx_signal_bot::feed::HttpPriceFeed;
use fx_signal_bot::notify::LogNotifier;
use fx_signal_bot::strategies::scorer::SignalScorer;
use fx_signal_bot::trading::risk_manager::RiskManager;
use fx_signal_bot::trading::store::JsonFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.to_lowercase()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let store = Arc::new(JsonFileStore::new(&cfg.state_dir));
    let risk = RiskManager::load(Arc::new(SystemClock), store).shared();
    let feed = Arc::new(
        HttpPriceFeed::new(&cfg.price_feed_url, cfg.bar).with_retries(cfg.fetch_retries),
    );
    let scorer = SignalScorer::new(cfg.scoring_mode);

    let bot = SignalBot::new(cfg, feed, scorer, risk, Arc::new(LogNotifier));
    bot.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received");
    })
    .await;

    Ok(())
}
