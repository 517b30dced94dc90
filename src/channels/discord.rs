//! Discord channel — Gateway WebSocket for events, REST API for actions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::{StatusCode, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, error, info, warn};

use crate::channels::{Attachment, Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Maximum content length for a single Discord message.
const DISCORD_MAX_MESSAGE_LENGTH: usize = 2000;

/// GUILDS (1) | GUILD_MESSAGES (512) | MESSAGE_CONTENT (32768)
const GATEWAY_INTENTS: u64 = 1 | 512 | 32768;

/// Used when Hello does not carry an interval.
const DEFAULT_HEARTBEAT_MS: u64 = 41_250;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Close codes after which reconnecting cannot succeed: authentication
/// failed (4004) or the shard/intents setup is rejected (4010-4014).
const FATAL_CLOSE_CODES: [u16; 6] = [4004, 4010, 4011, 4012, 4013, 4014];

/// Presence shown while connected ("Watching …").
const PRESENCE_NAME: &str = "for images to analyze 👁️";

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_base: DISCORD_API_BASE.to_string(),
        }
    }
}

/// Discord channel that receives via the Gateway and acts via REST.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
    running: Arc<AtomicBool>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.bot_token.expose_secret())
    }

    /// Build an API URL from raw path segments; each segment is
    /// percent-encoded (emoji included).
    fn api_url(&self, segments: &[&str]) -> Result<Url, ChannelError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| ChannelError::Http(format!("invalid API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ChannelError::Http("API base cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_message(&self, channel_id: &str, body: Value) -> Result<(), ChannelError> {
        let url = self.api_url(&["channels", channel_id, "messages"])?;
        let resp = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "discord".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "discord".into(),
                reason: format!("{status}: {body}"),
            });
        }
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::StartupFailed {
                name: "discord".into(),
                reason: "gateway already running".into(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let token = self.config.bot_token.clone();
        let api_base = self.config.api_base.clone();
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            info!("Discord channel listening for messages...");

            while running.load(Ordering::SeqCst) {
                match run_gateway_session(&client, &api_base, &token, &tx).await {
                    Ok(()) => {
                        info!("Discord listener channel closed");
                        break;
                    }
                    Err(e @ ChannelError::StartupFailed { .. }) => {
                        error!(error = %e, "Discord gateway rejected the bot, not reconnecting");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Discord gateway session ended, reconnecting");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn download(
        &self,
        attachment: &Attachment,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Vec<u8>, ChannelError> {
        let download_err = |reason: String| ChannelError::DownloadFailed {
            filename: attachment.filename.clone(),
            reason,
        };

        let resp = self
            .client
            .get(&attachment.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::DownloadTimeout {
                        filename: attachment.filename.clone(),
                        timeout,
                    }
                } else {
                    download_err(e.to_string())
                }
            })?;

        if resp.status() != StatusCode::OK {
            return Err(download_err(format!("HTTP {}", resp.status())));
        }

        if let Some(len) = resp.content_length() {
            check_size(&attachment.filename, len, max_bytes)?;
        }

        let bytes = resp.bytes().await.map_err(|e| download_err(e.to_string()))?;
        check_size(&attachment.filename, bytes.len() as u64, max_bytes)?;

        debug!(
            filename = %attachment.filename,
            bytes = bytes.len(),
            "Downloaded attachment"
        );
        Ok(bytes.to_vec())
    }

    async fn add_reaction(&self, msg: &IncomingMessage, emoji: &str) -> Result<(), ChannelError> {
        let url = self.api_url(&[
            "channels",
            &msg.channel_id,
            "messages",
            &msg.id,
            "reactions",
            emoji,
            "@me",
        ])?;

        let resp = self
            .client
            .put(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| ChannelError::ReactionFailed {
                emoji: emoji.to_string(),
                reason: e.to_string(),
            })?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS => Err(ChannelError::RateLimited {
                name: "discord".into(),
            }),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(ChannelError::ReactionFailed {
                    emoji: emoji.to_string(),
                    reason: format!("{status}: {body}"),
                })
            }
        }
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        match response {
            OutgoingResponse::Text(text) => {
                for chunk in split_message(&text, DISCORD_MAX_MESSAGE_LENGTH) {
                    self.post_message(&msg.channel_id, json!({ "content": chunk }))
                        .await?;
                }
                Ok(())
            }
            OutgoingResponse::Embed(embed) => {
                self.post_message(&msg.channel_id, json!({ "embeds": [embed] }))
                    .await
            }
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url(&["users", "@me"])?)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "discord".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "discord".into(),
                reason: format!("users/@me returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        info!("Discord channel shutting down");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ── Gateway session ─────────────────────────────────────────────────

/// Run one Gateway connection until it drops.
///
/// Returns `Ok(())` only when the receiving side has gone away.
async fn run_gateway_session(
    client: &reqwest::Client,
    api_base: &str,
    token: &SecretString,
    tx: &mpsc::UnboundedSender<IncomingMessage>,
) -> Result<(), ChannelError> {
    let disconnected = |reason: String| ChannelError::Disconnected {
        name: "discord".into(),
        reason,
    };

    let gateway_url = fetch_gateway_url(client, api_base, token).await?;
    info!(url = %gateway_url, "Connecting to Discord Gateway");

    let (ws_stream, _) = tokio_tungstenite::connect_async(gateway_url.as_str())
        .await
        .map_err(|e| disconnected(format!("connect failed: {e}")))?;
    let (ws_write, mut ws_read) = ws_stream.split();

    let heartbeat_ms = match ws_read.next().await {
        Some(Ok(frame)) => {
            let payload: Value = serde_json::from_str(frame.to_text().unwrap_or("{}"))
                .unwrap_or_default();
            heartbeat_interval(&payload)
        }
        _ => return Err(disconnected("no Hello from Gateway".into())),
    };
    debug!(heartbeat_ms, "Discord heartbeat interval");

    let writer = Arc::new(Mutex::new(ws_write));
    writer
        .lock()
        .await
        .send(WsMessage::Text(
            identify_payload(token.expose_secret()).to_string().into(),
        ))
        .await
        .map_err(|e| disconnected(format!("identify failed: {e}")))?;

    let sequence = Arc::new(AtomicI64::new(-1));
    let heartbeat = {
        let writer = Arc::clone(&writer);
        let sequence = Arc::clone(&sequence);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(heartbeat_ms));
            // First tick fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let payload = heartbeat_payload(sequence.load(Ordering::SeqCst));
                let mut w = writer.lock().await;
                if let Err(e) = w.send(WsMessage::Text(payload.to_string().into())).await {
                    warn!("Discord heartbeat failed: {e}");
                    break;
                }
            }
        })
    };

    let mut self_id: Option<String> = None;
    let result = loop {
        let frame = match ws_read.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break Err(disconnected(e.to_string())),
            None => break Err(disconnected("stream ended".into())),
        };

        if let WsMessage::Close(close) = &frame {
            break Err(close_error(close.as_ref()));
        }

        let Ok(text) = frame.to_text() else {
            continue;
        };
        let Ok(payload) = serde_json::from_str::<Value>(text) else {
            continue;
        };

        if let Some(s) = payload["s"].as_i64() {
            sequence.store(s, Ordering::SeqCst);
        }

        match payload["op"].as_u64() {
            Some(0) => match payload["t"].as_str() {
                Some("READY") => {
                    self_id = payload["d"]["user"]["id"].as_str().map(String::from);
                    info!(user_id = ?self_id, "Discord session ready");
                }
                Some("MESSAGE_CREATE") => {
                    let Some(msg) = parse_message_create(&payload["d"], self_id.as_deref())
                    else {
                        continue;
                    };
                    if tx.send(msg).is_err() {
                        break Ok(());
                    }
                }
                _ => {}
            },
            Some(1) => {
                let payload = heartbeat_payload(sequence.load(Ordering::SeqCst));
                let mut w = writer.lock().await;
                if let Err(e) = w.send(WsMessage::Text(payload.to_string().into())).await {
                    break Err(disconnected(format!("heartbeat failed: {e}")));
                }
            }
            Some(7) => break Err(disconnected("server requested reconnect".into())),
            Some(9) => break Err(disconnected("invalid session".into())),
            Some(11) => debug!("Discord heartbeat ACK"),
            _ => {}
        }
    };

    heartbeat.abort();
    result
}

async fn fetch_gateway_url(
    client: &reqwest::Client,
    api_base: &str,
    token: &SecretString,
) -> Result<String, ChannelError> {
    let disconnected = |reason: String| ChannelError::Disconnected {
        name: "discord".into(),
        reason,
    };

    let resp = client
        .get(format!("{}/gateway/bot", api_base.trim_end_matches('/')))
        .header(header::AUTHORIZATION, format!("Bot {}", token.expose_secret()))
        .send()
        .await
        .map_err(|e| disconnected(format!("gateway lookup failed: {e}")))?;

    match resp.status() {
        StatusCode::UNAUTHORIZED => {
            return Err(ChannelError::StartupFailed {
                name: "discord".into(),
                reason: "invalid bot token".into(),
            });
        }
        status if !status.is_success() => {
            return Err(disconnected(format!("gateway lookup returned {status}")));
        }
        _ => {}
    }

    let body: Value = resp.json().await.map_err(|e| disconnected(e.to_string()))?;
    let url = body["url"]
        .as_str()
        .ok_or_else(|| disconnected("missing 'url' in gateway response".into()))?;
    Ok(format!("{url}/?v=10&encoding=json"))
}

fn is_fatal_close_code(code: u16) -> bool {
    FATAL_CLOSE_CODES.contains(&code)
}

/// Classify a server close: fatal codes end the listener, everything else
/// is retried.
fn close_error(frame: Option<&CloseFrame>) -> ChannelError {
    let Some(frame) = frame else {
        return ChannelError::Disconnected {
            name: "discord".into(),
            reason: "closed by server".into(),
        };
    };
    let code = u16::from(frame.code);
    let reason = format!("closed by server ({code}): {}", frame.reason.as_str());
    if is_fatal_close_code(code) {
        ChannelError::StartupFailed {
            name: "discord".into(),
            reason,
        }
    } else {
        ChannelError::Disconnected {
            name: "discord".into(),
            reason,
        }
    }
}

// ── Payloads and parsing ────────────────────────────────────────────

fn heartbeat_interval(hello: &Value) -> u64 {
    if hello["op"].as_u64() == Some(10) {
        hello["d"]["heartbeat_interval"]
            .as_u64()
            .unwrap_or(DEFAULT_HEARTBEAT_MS)
    } else {
        error!("Expected Hello (op 10), got: {hello}");
        DEFAULT_HEARTBEAT_MS
    }
}

fn identify_payload(token: &str) -> Value {
    json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "emoji-reactor",
                "device": "emoji-reactor"
            },
            "presence": {
                "activities": [{ "name": PRESENCE_NAME, "type": 3 }],
                "status": "online",
                "since": null,
                "afk": false
            }
        }
    })
}

/// Heartbeat carrying the last sequence number (`null` before any).
fn heartbeat_payload(sequence: i64) -> Value {
    let d = if sequence < 0 { Value::Null } else { json!(sequence) };
    json!({ "op": 1, "d": d })
}

fn parse_attachment(value: &Value) -> Option<Attachment> {
    Some(Attachment {
        filename: value["filename"].as_str()?.to_string(),
        url: value["url"].as_str()?.to_string(),
        size: value["size"].as_u64().unwrap_or(0),
        content_type: value["content_type"].as_str().map(String::from),
    })
}

/// Convert a `MESSAGE_CREATE` payload into an [`IncomingMessage`].
fn parse_message_create(data: &Value, self_id: Option<&str>) -> Option<IncomingMessage> {
    let id = data["id"].as_str()?;
    let channel_id = data["channel_id"].as_str()?;
    let author_id = data["author"]["id"].as_str().unwrap_or_default();
    let content = data["content"].as_str().unwrap_or_default();

    let mut msg = IncomingMessage::new(id, channel_id, author_id, content);
    if let Some(name) = data["author"]["username"].as_str() {
        msg = msg.with_author_name(name);
    }
    if data["author"]["bot"].as_bool() == Some(true) {
        msg.author_is_bot = true;
    }
    msg.from_self = self_id.is_some_and(|me| me == author_id);

    if let Some(items) = data["attachments"].as_array() {
        msg.attachments = items.iter().filter_map(parse_attachment).collect();
    }
    Some(msg)
}

fn check_size(filename: &str, size: u64, max: u64) -> Result<(), ChannelError> {
    if size > max {
        return Err(ChannelError::TooLarge {
            filename: filename.to_string(),
            size,
            max,
        });
    }
    Ok(())
}

/// Split a message into chunks of at most `max_len` bytes.
/// Prefers newlines, then spaces, and never cuts inside a character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
