//! Shared types for the reaction pipeline.

use std::time::Duration;

use crate::emoji::DEFAULT_MAX_EMOJIS;

/// Default cap on downloaded image size (10 MiB).
pub const DEFAULT_MAX_IMAGE_SIZE: u64 = 10_485_760;

/// Default bound on the analysis call and the download.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed pause between consecutive reactions.
pub const REACTION_DELAY: Duration = Duration::from_millis(500);

/// Reaction added to an image that could not be processed.
pub const FAILURE_MARKER: &str = "❌";

/// Tunables for [`ReactionProcessor`](crate::pipeline::ReactionProcessor).
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_image_size: u64,
    pub analysis_timeout: Duration,
    pub max_emojis: usize,
    pub reaction_delay: Duration,
    /// Marker reaction for failed images; `None` disables it.
    pub failure_marker: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            max_emojis: DEFAULT_MAX_EMOJIS,
            reaction_delay: REACTION_DELAY,
            failure_marker: Some(FAILURE_MARKER.to_string()),
        }
    }
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// Analysed and mapped; `added` reactions succeeded, `failed` did not.
    Reacted { added: Vec<String>, failed: Vec<String> },
    /// Not attempted (declared size over the limit).
    Skipped { reason: String },
    /// Download or analysis failed.
    Failed { error: String },
}

impl AttachmentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reacted { .. } => "reacted",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Per-message summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub message_id: String,
    /// `(filename, outcome)` per image attachment, in message order.
    pub outcomes: Vec<(String, AttachmentOutcome)>,
}

impl ProcessReport {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn images(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, AttachmentOutcome::Failed { .. }))
            .count()
    }

    pub fn reactions_added(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                AttachmentOutcome::Reacted { added, .. } => added.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn reactions_failed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                AttachmentOutcome::Reacted { failed, .. } => failed.len(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProcessorConfig::default();
        assert_eq!(config.max_image_size, 10_485_760);
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.max_emojis, 3);
        assert_eq!(config.reaction_delay, Duration::from_millis(500));
        assert_eq!(config.failure_marker.as_deref(), Some("❌"));
    }

    #[test]
    fn report_counts() {
        let mut report = ProcessReport::new("m1");
        report.outcomes.push((
            "a.png".into(),
            AttachmentOutcome::Reacted {
                added: vec!["🐶".into(), "😊".into()],
                failed: vec!["🔴".into()],
            },
        ));
        report.outcomes.push((
            "b.png".into(),
            AttachmentOutcome::Failed {
                error: "boom".into(),
            },
        ));
        report.outcomes.push((
            "c.png".into(),
            AttachmentOutcome::Skipped {
                reason: "too large".into(),
            },
        ));

        assert_eq!(report.images(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.reactions_added(), 2);
        assert_eq!(report.reactions_failed(), 1);
        assert_eq!(report.outcomes[2].1.label(), "skipped");
    }
}
