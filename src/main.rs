use std::sync::Arc;

use emoji_reactor::bot::ReactorBot;
use emoji_reactor::channels::{Channel, DiscordChannel};
use emoji_reactor::config::BotConfig;
use emoji_reactor::error::Result;
use emoji_reactor::logging;
use emoji_reactor::vision::create_analyzer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  Set DISCORD_TOKEN, TARGET_CHANNEL_ID and OPENAI_API_KEY");
            eprintln!("  (environment variables or a .env file)");
            std::process::exit(1);
        }
    };

    serve(config).await?;
    Ok(())
}

/// Start logging, verify the Discord token, then run until shutdown.
async fn serve(config: BotConfig) -> Result<()> {
    let _log_guard = logging::init_logging(&config.log_level, &config.log_dir)?;

    eprintln!("🤖 Emoji Reactor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Channel: <#{}>", config.target_channel_id);
    eprintln!("   Vision model: {}", config.vision_model);
    eprintln!("   Max emojis per image: {}", config.max_emojis);
    eprintln!(
        "   Emoji admins: {}",
        if config.admin_user_ids.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else if config.admin_user_ids.is_empty() {
            "none".to_string()
        } else {
            config.admin_user_ids.join(", ")
        }
    );

    let channel: Arc<dyn Channel> = Arc::new(DiscordChannel::new(config.discord_config()));
    channel.health_check().await?;

    let vision = create_analyzer(&config.vision_config());
    ReactorBot::new(&config, channel, vision).run().await
}
