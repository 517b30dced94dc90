//! Reaction processor — turns image attachments into emoji reactions.
//!
//! Flow per image attachment:
//! 1. Size gate on the declared size
//! 2. Download (channel)
//! 3. Vision analysis on a detached task, bounded by the timeout
//! 4. Emoji mapping
//! 5. Reactions, one at a time with a fixed delay
//!
//! Every failure is logged and contained to its attachment (or, for
//! reactions, to its emoji). Nothing here returns an error to the caller.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::channels::{Attachment, Channel, IncomingMessage};
use crate::emoji::{EmojiMapper, RandomSource, SystemRandom};
use crate::error::PipelineError;
use crate::pipeline::types::{AttachmentOutcome, ProcessReport, ProcessorConfig};
use crate::vision::{self, ImageInput, VisionAnalyzer};

/// Characters of analysis text echoed to the log.
const ANALYSIS_PREVIEW_CHARS: usize = 100;

/// Runs the download → analyze → map → react sequence for one message.
pub struct ReactionProcessor {
    channel: Arc<dyn Channel>,
    vision: Arc<dyn VisionAnalyzer>,
    mapper: Arc<RwLock<EmojiMapper>>,
    rng: Mutex<Box<dyn RandomSource>>,
    config: ProcessorConfig,
}

impl ReactionProcessor {
    pub fn new(
        channel: Arc<dyn Channel>,
        vision: Arc<dyn VisionAnalyzer>,
        mapper: Arc<RwLock<EmojiMapper>>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            channel,
            vision,
            mapper,
            rng: Mutex::new(Box::new(SystemRandom::new())),
            config,
        }
    }

    /// Replace the random source (tests use a fixed sequence).
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process every image attachment on `msg`.
    pub async fn process(&self, msg: &IncomingMessage) -> ProcessReport {
        let mut report = ProcessReport::new(&msg.id);

        let images: Vec<&Attachment> = msg.image_attachments().collect();
        if images.is_empty() {
            debug!(id = %msg.id, "No image attachments");
            return report;
        }

        info!(
            id = %msg.id,
            count = images.len(),
            author = %msg.author_label(),
            "Found image(s) in message"
        );

        for attachment in images {
            let outcome = self.process_attachment(msg, attachment).await;
            report.outcomes.push((attachment.filename.clone(), outcome));
        }

        info!(
            id = %msg.id,
            images = report.images(),
            failed = report.failed(),
            reactions = report.reactions_added(),
            "Message processing complete"
        );
        report
    }

    /// Map analysis text to emoji with the shared table and random source.
    pub async fn map_emojis(&self, analysis: &str) -> Vec<String> {
        let mapper = self.mapper.read().await;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        mapper.emojis_for(analysis, self.config.max_emojis, &mut **rng)
    }

    async fn process_attachment(
        &self,
        msg: &IncomingMessage,
        attachment: &Attachment,
    ) -> AttachmentOutcome {
        info!(filename = %attachment.filename, size = attachment.size, "Processing image");

        if attachment.size > self.config.max_image_size {
            warn!(
                filename = %attachment.filename,
                size = attachment.size,
                max = self.config.max_image_size,
                "Image exceeds size limit, skipping"
            );
            return AttachmentOutcome::Skipped {
                reason: format!(
                    "{} bytes exceeds limit of {}",
                    attachment.size, self.config.max_image_size
                ),
            };
        }

        let emojis = match self.analyze_and_map(attachment).await {
            Ok(emojis) => emojis,
            Err(e) => {
                error!(filename = %attachment.filename, error = %e, "Error processing image");
                self.mark_failed(msg).await;
                return AttachmentOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if emojis.is_empty() {
            info!(filename = %attachment.filename, "No suitable emojis found for this image");
        }

        let (added, failed) = self.react_all(msg, &emojis).await;
        AttachmentOutcome::Reacted { added, failed }
    }

    async fn analyze_and_map(&self, attachment: &Attachment) -> Result<Vec<String>, PipelineError> {
        let bytes = self
            .channel
            .download(
                attachment,
                self.config.max_image_size,
                self.config.analysis_timeout,
            )
            .await
            .map_err(PipelineError::Download)?;

        let mime_type =
            vision::mime_type_for(attachment.content_type.as_deref(), &attachment.filename);
        let image = ImageInput::new(bytes, mime_type);
        let analysis = vision::analyze_detached(
            Arc::clone(&self.vision),
            image,
            self.config.analysis_timeout,
        )
        .await?;

        let preview: String = analysis.chars().take(ANALYSIS_PREVIEW_CHARS).collect();
        info!(
            provider = self.vision.provider_name(),
            analysis = %preview,
            "Analysis result"
        );

        Ok(self.map_emojis(&analysis).await)
    }

    /// Add each emoji in order, pausing between them. Returns
    /// `(added, failed)`.
    async fn react_all(
        &self,
        msg: &IncomingMessage,
        emojis: &[String],
    ) -> (Vec<String>, Vec<String>) {
        let mut added = Vec::with_capacity(emojis.len());
        let mut failed = Vec::new();

        for (i, emoji) in emojis.iter().enumerate() {
            if i > 0 && !self.config.reaction_delay.is_zero() {
                tokio::time::sleep(self.config.reaction_delay).await;
            }

            match self.channel.add_reaction(msg, emoji).await {
                Ok(()) => {
                    info!(id = %msg.id, emoji = %emoji, "Added reaction");
                    added.push(emoji.clone());
                }
                Err(e) => {
                    error!(id = %msg.id, emoji = %emoji, error = %e, "Failed to add reaction");
                    failed.push(emoji.clone());
                }
            }
        }

        (added, failed)
    }

    /// Best-effort failure marker; errors are dropped.
    async fn mark_failed(&self, msg: &IncomingMessage) {
        let Some(marker) = &self.config.failure_marker else {
            return;
        };
        if let Err(e) = self.channel.add_reaction(msg, marker).await {
            debug!(id = %msg.id, error = %e, "Could not add failure marker");
        }
    }
}
