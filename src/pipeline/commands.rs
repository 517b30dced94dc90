//! Chat commands (`!status`, `!test`, `!emoji ...`).
//!
//! Commands run after image handling for the same message. Keyword table
//! edits are restricted to the admin allowlist.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::channels::{Channel, Embed, IncomingMessage, OutgoingResponse};
use crate::emoji::EmojiMapper;
use crate::error::PipelineError;

pub const COMMAND_PREFIX: char = '!';

/// Discord's "green".
const STATUS_COLOR: u32 = 0x2ecc71;

const TEST_REPLY: &str = "🤖 Bot is working! Send an image to see magic happen!";

const EMOJI_USAGE: &str = "Usage: `!emoji add <keyword> <emoji...>`, \
                           `!emoji remove <keyword>`, `!emoji list`";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Test,
    EmojiAdd { keyword: String, emojis: Vec<String> },
    EmojiRemove { keyword: String },
    EmojiList,
    /// Recognised command with malformed arguments.
    Usage(&'static str),
}

impl Command {
    /// Parse message content. `None` for plain messages and unknown commands.
    pub fn parse(content: &str) -> Option<Self> {
        let body = content.trim().strip_prefix(COMMAND_PREFIX)?;
        let mut tokens = body.split_whitespace();
        let name = tokens.next()?.to_lowercase();

        match name.as_str() {
            "status" => Some(Self::Status),
            "test" => Some(Self::Test),
            "emoji" => Some(Self::parse_emoji(tokens.collect())),
            _ => None,
        }
    }

    fn parse_emoji(args: Vec<&str>) -> Self {
        let Some((sub, rest)) = args.split_first() else {
            return Self::Usage(EMOJI_USAGE);
        };

        match sub.to_lowercase().as_str() {
            "list" => Self::EmojiList,
            "remove" if !rest.is_empty() => Self::EmojiRemove {
                keyword: rest.join(" "),
            },
            "add" => {
                // Trailing tokens without ASCII letters or digits are emoji.
                let split = rest
                    .iter()
                    .rposition(|t| t.chars().any(|c| c.is_ascii_alphanumeric()))
                    .map_or(0, |i| i + 1);
                let (keyword, emojis) = rest.split_at(split);
                if keyword.is_empty() || emojis.is_empty() {
                    return Self::Usage(EMOJI_USAGE);
                }
                Self::EmojiAdd {
                    keyword: keyword.join(" "),
                    emojis: emojis.iter().map(|e| e.to_string()).collect(),
                }
            }
            _ => Self::Usage(EMOJI_USAGE),
        }
    }

    fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::EmojiAdd { .. } | Self::EmojiRemove { .. } | Self::EmojiList
        )
    }
}

/// Executes commands and replies on the channel.
pub struct CommandHandler {
    channel: Arc<dyn Channel>,
    mapper: Arc<RwLock<EmojiMapper>>,
    target_channel_id: String,
    admin_user_ids: Vec<String>,
}

impl CommandHandler {
    pub fn new(
        channel: Arc<dyn Channel>,
        mapper: Arc<RwLock<EmojiMapper>>,
        target_channel_id: impl Into<String>,
        admin_user_ids: Vec<String>,
    ) -> Self {
        Self {
            channel,
            mapper,
            target_channel_id: target_channel_id.into(),
            admin_user_ids,
        }
    }

    /// Check if a user may edit the keyword table. `*` allows everyone;
    /// an empty list allows nobody.
    pub fn is_user_allowed(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|u| u == "*" || u == user_id)
    }

    /// Handle `msg` if it is a command. Returns whether a command ran.
    pub async fn handle(&self, msg: &IncomingMessage) -> Result<bool, PipelineError> {
        let Some(command) = Command::parse(&msg.content) else {
            return Ok(false);
        };

        info!(id = %msg.id, author = %msg.author_label(), command = ?command, "Running command");
        let response = self.execute(&command, &msg.author_id).await;
        self.channel
            .respond(msg, response)
            .await
            .map_err(|e| PipelineError::Command(e.to_string()))?;
        Ok(true)
    }

    /// Run `command` for `author_id` and build the reply.
    pub async fn execute(&self, command: &Command, author_id: &str) -> OutgoingResponse {
        if command.is_admin_only() && !self.is_user_allowed(author_id) {
            warn!(author = %author_id, "Rejected emoji command from non-admin");
            return OutgoingResponse::text("⛔ You are not allowed to change emoji mappings.");
        }

        match command {
            Command::Status => OutgoingResponse::Embed(self.status_embed()),
            Command::Test => OutgoingResponse::text(TEST_REPLY),
            Command::Usage(usage) => OutgoingResponse::text(*usage),
            Command::EmojiList => OutgoingResponse::text(self.list_mappings().await),
            Command::EmojiAdd { keyword, emojis } => {
                let mut mapper = self.mapper.write().await;
                match mapper.table_mut().add_mapping(keyword, emojis.clone()) {
                    Ok(()) => OutgoingResponse::text(format!(
                        "✅ Mapped `{}` → {}",
                        keyword.to_lowercase(),
                        emojis.join(" ")
                    )),
                    Err(e) => OutgoingResponse::text(format!("⚠️ {e}")),
                }
            }
            Command::EmojiRemove { keyword } => {
                let removed = self.mapper.write().await.table_mut().remove_mapping(keyword);
                if removed {
                    OutgoingResponse::text(format!("🗑️ Removed `{}`", keyword.to_lowercase()))
                } else {
                    OutgoingResponse::text(format!("No mapping for `{}`", keyword.to_lowercase()))
                }
            }
        }
    }

    fn status_embed(&self) -> Embed {
        Embed::new("Bot Status", "Image Recognition Bot is running!", STATUS_COLOR)
            .field(
                "Monitoring Channel",
                format!("<#{}>", self.target_channel_id),
                false,
            )
            .field("Supported Formats", "PNG, JPG, JPEG, GIF, WEBP", false)
    }

    async fn list_mappings(&self) -> String {
        let mapper = self.mapper.read().await;
        let table = mapper.table();
        let mut out = format!("**Keyword mappings** ({})\n", table.len());
        for (keyword, emojis) in table.iter() {
            out.push_str(&format!("`{keyword}` → {}\n", emojis.join(" ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::channels::{Attachment, MessageStream};
    use crate::emoji::{KeywordTable, SentimentLexicon};
    use crate::error::ChannelError;

    // ── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn parses_simple_commands() {
        assert_eq!(Command::parse("!status"), Some(Command::Status));
        assert_eq!(Command::parse("  !TEST  "), Some(Command::Test));
        assert_eq!(Command::parse("!emoji list"), Some(Command::EmojiList));
    }

    #[test]
    fn plain_and_unknown_are_ignored() {
        assert_eq!(Command::parse("look at my dog"), None);
        assert_eq!(Command::parse("!"), None);
        assert_eq!(Command::parse("!help"), None);
    }

    #[test]
    fn parses_emoji_add_with_multi_word_keyword() {
        assert_eq!(
            Command::parse("!emoji add ice cream 🍦 🍨"),
            Some(Command::EmojiAdd {
                keyword: "ice cream".into(),
                emojis: vec!["🍦".into(), "🍨".into()],
            })
        );
    }

    #[test]
    fn emoji_add_needs_keyword_and_emoji() {
        assert_eq!(
            Command::parse("!emoji add sushi"),
            Some(Command::Usage(EMOJI_USAGE))
        );
        assert_eq!(
            Command::parse("!emoji add 🍣"),
            Some(Command::Usage(EMOJI_USAGE))
        );
        assert_eq!(Command::parse("!emoji"), Some(Command::Usage(EMOJI_USAGE)));
        assert_eq!(
            Command::parse("!emoji remove"),
            Some(Command::Usage(EMOJI_USAGE))
        );
    }

    #[test]
    fn parses_emoji_remove() {
        assert_eq!(
            Command::parse("!emoji remove Ice Cream"),
            Some(Command::EmojiRemove {
                keyword: "Ice Cream".into()
            })
        );
    }

    // ── Handler ─────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingChannel {
        sent: std::sync::Mutex<Vec<OutgoingResponse>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn download(
            &self,
            attachment: &Attachment,
            _max_bytes: u64,
            _timeout: Duration,
        ) -> Result<Vec<u8>, ChannelError> {
            Err(ChannelError::DownloadFailed {
                filename: attachment.filename.clone(),
                reason: "not supported".into(),
            })
        }

        async fn add_reaction(&self, _: &IncomingMessage, _: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(response);
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn handler(admins: &[&str]) -> (CommandHandler, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let table = KeywordTable::from_pairs([("dog", vec!["🐶"])]).unwrap();
        let mapper = Arc::new(RwLock::new(EmojiMapper::new(
            table,
            SentimentLexicon::default(),
        )));
        let handler = CommandHandler::new(
            channel.clone(),
            mapper,
            "123",
            admins.iter().map(|a| a.to_string()).collect(),
        );
        (handler, channel)
    }

    #[test]
    fn allowlist_semantics() {
        assert!(!handler(&[]).0.is_user_allowed("anyone"));
        assert!(handler(&["*"]).0.is_user_allowed("anyone"));
        let (h, _) = handler(&["42"]);
        assert!(h.is_user_allowed("42"));
        assert!(!h.is_user_allowed("7"));
    }

    #[tokio::test]
    async fn status_reply_is_embed() {
        let (h, channel) = handler(&[]);
        let msg = IncomingMessage::new("m", "123", "u", "!status");

        assert!(h.handle(&msg).await.unwrap());

        let sent = channel.sent.lock().unwrap();
        match &sent[0] {
            OutgoingResponse::Embed(embed) => {
                assert_eq!(embed.title, "Bot Status");
                assert_eq!(embed.color, STATUS_COLOR);
                assert_eq!(embed.fields[0].name, "Monitoring Channel");
                assert_eq!(embed.fields[0].value, "<#123>");
                assert_eq!(embed.fields[1].value, "PNG, JPG, JPEG, GIF, WEBP");
            }
            other => panic!("expected embed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reply_text() {
        let (h, channel) = handler(&[]);
        h.handle(&IncomingMessage::new("m", "123", "u", "!test"))
            .await
            .unwrap();
        assert_eq!(channel.sent.lock().unwrap()[0], OutgoingResponse::text(TEST_REPLY));
    }

    #[tokio::test]
    async fn non_command_is_not_handled() {
        let (h, channel) = handler(&[]);
        assert!(!h.handle(&IncomingMessage::new("m", "123", "u", "nice")).await.unwrap());
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_admin_cannot_edit_table() {
        let (h, _) = handler(&["42"]);
        let cmd = Command::EmojiAdd {
            keyword: "sushi".into(),
            emojis: vec!["🍣".into()],
        };

        let reply = h.execute(&cmd, "7").await;

        assert!(matches!(reply, OutgoingResponse::Text(t) if t.starts_with("⛔")));
        assert!(!h.mapper.read().await.table().contains("sushi"));
    }

    #[tokio::test]
    async fn admin_add_list_remove() {
        let (h, _) = handler(&["42"]);

        h.execute(
            &Command::EmojiAdd {
                keyword: "Sushi".into(),
                emojis: vec!["🍣".into()],
            },
            "42",
        )
        .await;
        assert!(h.mapper.read().await.table().contains("sushi"));

        let OutgoingResponse::Text(listing) = h.execute(&Command::EmojiList, "42").await else {
            panic!("expected text");
        };
        assert!(listing.contains("(2)"));
        assert!(listing.contains("`sushi` → 🍣"));

        let reply = h
            .execute(
                &Command::EmojiRemove {
                    keyword: "sushi".into(),
                },
                "42",
            )
            .await;
        assert_eq!(reply, OutgoingResponse::text("🗑️ Removed `sushi`"));
        assert!(!h.mapper.read().await.table().contains("sushi"));

        let reply = h
            .execute(
                &Command::EmojiRemove {
                    keyword: "sushi".into(),
                },
                "42",
            )
            .await;
        assert_eq!(reply, OutgoingResponse::text("No mapping for `sushi`"));
    }
}
