//! End-to-end reaction flow with an in-memory channel and vision backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use emoji_reactor::bot::ReactorBot;
use emoji_reactor::channels::{
    Attachment, Channel, IncomingMessage, MessageStream, OutgoingResponse,
};
use emoji_reactor::config::BotConfig;
use emoji_reactor::emoji::{EmojiMapper, FixedSequence};
use emoji_reactor::error::{ChannelError, VisionError};
use emoji_reactor::pipeline::{CommandHandler, ProcessorConfig, ReactionProcessor};
use emoji_reactor::vision::{ImageInput, VisionAnalyzer};

const TARGET: &str = "1000";

// ── In-memory channel ───────────────────────────────────────────────

#[derive(Default)]
struct MemoryChannel {
    inbound: Mutex<Vec<IncomingMessage>>,
    reactions: Mutex<Vec<(String, String)>>,
    replies: Mutex<Vec<OutgoingResponse>>,
}

impl MemoryChannel {
    fn with_inbound(messages: Vec<IncomingMessage>) -> Self {
        Self {
            inbound: Mutex::new(messages),
            ..Self::default()
        }
    }

    fn reactions_for(&self, message_id: &str) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == message_id)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    fn name(&self) -> &str {
        "memory"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let messages = std::mem::take(&mut *self.inbound.lock().unwrap());
        Ok(Box::pin(futures::stream::iter(messages)))
    }

    async fn download(
        &self,
        attachment: &Attachment,
        _max_bytes: u64,
        _timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        if attachment.url.starts_with("broken://") {
            return Err(ChannelError::DownloadFailed {
                filename: attachment.filename.clone(),
                reason: "HTTP 500".into(),
            });
        }
        Ok(attachment.url.as_bytes().to_vec())
    }

    async fn add_reaction(&self, msg: &IncomingMessage, emoji: &str) -> Result<(), ChannelError> {
        self.reactions
            .lock()
            .unwrap()
            .push((msg.id.clone(), emoji.to_string()));
        Ok(())
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.replies.lock().unwrap().push(response);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Describes every image the same way.
struct FixedVision(&'static str);

#[async_trait]
impl VisionAnalyzer for FixedVision {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    async fn analyze(&self, _image: ImageInput) -> Result<String, VisionError> {
        Ok(self.0.to_string())
    }
}

fn image_message(id: &str, channel_id: &str, url: &str) -> IncomingMessage {
    IncomingMessage::new(id, channel_id, "42", "")
        .with_author_name("alice")
        .with_attachment(Attachment::new("photo.png", url, 1024))
}

fn deterministic_bot(channel: Arc<MemoryChannel>, description: &'static str) -> ReactorBot {
    let mapper = Arc::new(RwLock::new(EmojiMapper::default()));
    let config = ProcessorConfig {
        reaction_delay: Duration::ZERO,
        ..ProcessorConfig::default()
    };
    let processor = ReactionProcessor::new(
        channel.clone(),
        Arc::new(FixedVision(description)),
        Arc::clone(&mapper),
        config,
    )
    .with_random_source(Box::new(FixedSequence::new(vec![0])));
    let commands = CommandHandler::new(channel.clone(), mapper, TARGET, vec!["42".into()]);
    ReactorBot::from_parts(channel, processor, commands, TARGET)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn image_gets_first_candidate_of_each_keyword() {
    let channel = Arc::new(MemoryChannel::default());
    let bot = deterministic_bot(channel.clone(), "A happy dog playing with a red ball");

    let report = bot.handle(&image_message("m1", TARGET, "cdn://dog")).await;

    assert_eq!(report.images(), 1);
    assert_eq!(report.reactions_added(), 3);
    assert_eq!(channel.reactions_for("m1"), ["🐶", "😊", "❤️"]);
}

#[tokio::test]
async fn failed_download_gets_marker_only() {
    let channel = Arc::new(MemoryChannel::default());
    let bot = deterministic_bot(channel.clone(), "A happy dog");

    let report = bot.handle(&image_message("m1", TARGET, "broken://x")).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(channel.reactions_for("m1"), ["❌"]);
}

#[tokio::test]
async fn command_runs_after_images() {
    let channel = Arc::new(MemoryChannel::default());
    let bot = deterministic_bot(channel.clone(), "A cat");

    let msg = IncomingMessage::new("m1", TARGET, "42", "!emoji add sushi 🍣")
        .with_attachment(Attachment::new("cat.jpg", "cdn://cat", 10));
    bot.handle(&msg).await;

    assert_eq!(channel.reactions_for("m1"), ["🐱"]);
    let replies = channel.replies.lock().unwrap();
    assert!(matches!(&replies[0], OutgoingResponse::Text(t) if t.contains("sushi")));
}

#[tokio::test]
async fn filters_own_messages_and_other_channels() {
    let channel = Arc::new(MemoryChannel::default());
    let bot = deterministic_bot(channel, "A dog");

    assert!(bot.should_handle(&image_message("m1", TARGET, "cdn://a")));
    assert!(!bot.should_handle(&image_message("m2", "999", "cdn://a")));
    // Another bot posting an image still gets reactions.
    assert!(bot.should_handle(&image_message("m3", TARGET, "cdn://a").from_bot(false)));
    assert!(!bot.should_handle(&image_message("m4", TARGET, "cdn://a").from_bot(true)));
}

#[tokio::test]
async fn run_processes_stream_until_it_ends() {
    let channel = Arc::new(MemoryChannel::with_inbound(vec![
        image_message("m1", TARGET, "cdn://dog"),
        image_message("m2", "999", "cdn://dog"),
        image_message("m3", TARGET, "cdn://dog").from_bot(false),
        image_message("m4", TARGET, "cdn://dog").from_bot(true),
    ]));
    let config = BotConfig::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("token".into()),
        "TARGET_CHANNEL_ID" => Some(TARGET.into()),
        "OPENAI_API_KEY" => Some("sk-test".into()),
        "MAX_EMOJIS_PER_IMAGE" => Some("1".into()),
        _ => None,
    })
    .unwrap();

    let bot = ReactorBot::new(&config, channel.clone(), Arc::new(FixedVision("A dog")));
    bot.run().await.unwrap();

    let dogs = ["🐶", "🐕", "🦮", "🐕‍🦺"];
    for id in ["m1", "m3"] {
        let reactions = channel.reactions_for(id);
        assert_eq!(reactions.len(), 1, "{id}");
        assert!(dogs.contains(&reactions[0].as_str()), "{id}");
    }
    assert!(channel.reactions_for("m2").is_empty());
    assert!(channel.reactions_for("m4").is_empty());
}
