mod categories;
mod config;
mod forwarder;
mod platform;
mod relay;
mod reply_router;
mod scheduler;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::platform::telegram::{self, TelegramTransport};
use crate::relay::Relay;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,contact_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Admin chat: {}", config.admin_chat_id());
    info!(
        "  Idle timeout: {}s",
        config.conversation.idle_timeout_secs
    );

    let bot = Bot::new(&config.telegram.bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let relay = Arc::new(Relay::new(&config, transport));

    // Background expiry sweep
    let mut scheduler = Scheduler::new().await?;
    scheduler::tasks::register_session_sweep(
        &scheduler,
        &config.conversation.sweep_cron,
        relay.clone(),
    )
    .await?;
    scheduler.start().await?;

    info!("Bot is starting...");
    telegram::run(bot, relay).await?;

    scheduler.shutdown().await?;
    Ok(())
}
