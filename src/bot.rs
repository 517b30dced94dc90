//! Event loop: consumes the channel's message stream and dispatches each
//! message from the target channel on its own task.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::channels::{Channel, IncomingMessage};
use crate::config::BotConfig;
use crate::emoji::EmojiMapper;
use crate::error::Error;
use crate::pipeline::{CommandHandler, ProcessReport, ReactionProcessor};
use crate::vision::VisionAnalyzer;

/// The reactor: one channel, one vision backend, one shared keyword table.
pub struct ReactorBot {
    channel: Arc<dyn Channel>,
    processor: Arc<ReactionProcessor>,
    commands: Arc<CommandHandler>,
    target_channel_id: String,
}

impl ReactorBot {
    pub fn new(
        config: &BotConfig,
        channel: Arc<dyn Channel>,
        vision: Arc<dyn VisionAnalyzer>,
    ) -> Self {
        let mapper = Arc::new(RwLock::new(EmojiMapper::default()));
        let processor = ReactionProcessor::new(
            Arc::clone(&channel),
            vision,
            Arc::clone(&mapper),
            config.processor_config(),
        );
        let commands = CommandHandler::new(
            Arc::clone(&channel),
            mapper,
            config.target_channel_id.clone(),
            config.admin_user_ids.clone(),
        );
        Self::from_parts(channel, processor, commands, &config.target_channel_id)
    }

    /// Assemble from prebuilt parts.
    pub fn from_parts(
        channel: Arc<dyn Channel>,
        processor: ReactionProcessor,
        commands: CommandHandler,
        target_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            processor: Arc::new(processor),
            commands: Arc::new(commands),
            target_channel_id: target_channel_id.into(),
        }
    }

    /// Whether `msg` should be handled at all: posted in the target channel
    /// by anyone but this bot. Images from other bots are handled.
    pub fn should_handle(&self, msg: &IncomingMessage) -> bool {
        !msg.from_self && msg.channel_id == self.target_channel_id
    }

    /// Images first, then commands.
    pub async fn handle(&self, msg: &IncomingMessage) -> ProcessReport {
        handle_message(&self.processor, &self.commands, msg).await
    }

    /// Run until Ctrl+C or the channel stream ends. In-flight messages are
    /// finished before the channel shuts down.
    pub async fn run(self) -> Result<(), Error> {
        let mut stream = self.channel.start().await?;
        info!(
            channel = self.channel.name(),
            target = %self.target_channel_id,
            "Emoji reactor ready and listening"
        );

        let mut tasks = JoinSet::new();

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join_error(joined);
                    continue;
                }
                msg = stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            if !self.should_handle(&message) {
                debug!(id = %message.id, channel_id = %message.channel_id, "Ignoring message");
                continue;
            }

            // One task per message.
            let processor = Arc::clone(&self.processor);
            let commands = Arc::clone(&self.commands);
            tasks.spawn(async move {
                handle_message(&processor, &commands, &message).await;
            });
        }

        if !tasks.is_empty() {
            info!(pending = tasks.len(), "Waiting for in-flight messages");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }

        if let Err(e) = self.channel.shutdown().await {
            error!(error = %e, "Channel shutdown failed");
        }
        Ok(())
    }
}

fn log_join_error(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Message task failed");
    }
}

async fn handle_message(
    processor: &ReactionProcessor,
    commands: &CommandHandler,
    msg: &IncomingMessage,
) -> ProcessReport {
    let report = processor.process(msg).await;
    if let Err(e) = commands.handle(msg).await {
        error!(id = %msg.id, error = %e, "Command failed");
    }
    report
}
