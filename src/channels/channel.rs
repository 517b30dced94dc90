//! Channel trait and the message types that flow through it.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::error::ChannelError;

/// File extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Stream of inbound messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A file delivered with a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Declared MIME type, preferred over the extension when supported.
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            size,
            content_type: None,
        }
    }

    /// Whether the filename ends in one of [`IMAGE_EXTENSIONS`] (case-insensitive).
    pub fn is_image(&self) -> bool {
        let lower = self.filename.to_lowercase();
        IMAGE_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
    }
}

/// An inbound chat message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    /// Authored by any bot account.
    pub author_is_bot: bool,
    /// Authored by this bot.
    pub from_self: bool,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl IncomingMessage {
    pub fn new(
        id: impl Into<String>,
        channel_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            author_name: None,
            author_is_bot: false,
            from_self: false,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn from_bot(mut self, from_self: bool) -> Self {
        self.author_is_bot = true;
        self.from_self = from_self;
        self
    }

    /// Attachments that pass the image extension allow-list.
    pub fn image_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_image())
    }

    /// Display name for logs.
    pub fn author_label(&self) -> &str {
        self.author_name.as_deref().unwrap_or(&self.author_id)
    }
}

/// A field inside an embed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rich embed reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            fields: Vec::new(),
        }
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// A reply to send back to the channel a message came from.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingResponse {
    Text(String),
    Embed(Embed),
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// A chat service: inbound message stream plus the outbound operations the
/// reactor needs.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Download an attachment's bytes, bounded in size and time.
    async fn download(
        &self,
        attachment: &Attachment,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError>;

    /// Attach an emoji reaction to a message.
    async fn add_reaction(&self, msg: &IncomingMessage, emoji: &str) -> Result<(), ChannelError>;

    /// Reply in the message's channel.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Check that the channel can reach its service.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Stop receiving.
    async fn shutdown(&self) -> Result<(), ChannelError>;
}
