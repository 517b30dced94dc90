//! Sentiment fallback — used only when no keyword matched.

use crate::emoji::random::{self, RandomSource};
use crate::error::MappingError;

const POSITIVE_WORDS: &[&str] = &[
    "beautiful", "amazing", "wonderful", "great", "awesome", "fantastic", "lovely", "perfect",
    "excellent", "stunning", "gorgeous", "incredible", "impressive", "brilliant", "magnificent",
    "spectacular", "marvelous", "delightful", "charming", "elegant", "graceful", "vibrant",
    "colorful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "terrible", "awful", "bad", "horrible", "ugly", "disgusting", "disappointing",
    "boring", "dull", "dark", "gloomy", "depressing",
];

const POSITIVE_REACTIONS: &[&str] = &["👍", "👏", "🔥", "💯", "✨", "⭐", "😍"];
const NEGATIVE_REACTIONS: &[&str] = &["😔", "😞", "💔"];
const NEUTRAL_REACTIONS: &[&str] = &["👀", "🤔", "😮", "🙂"];

/// Overall tone of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Positive and negative word lists plus the reaction pool for each tone.
#[derive(Debug, Clone)]
pub struct SentimentLexicon {
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
    pub positive_reactions: Vec<String>,
    pub negative_reactions: Vec<String>,
    pub neutral_reactions: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive_words: owned(POSITIVE_WORDS),
            negative_words: owned(NEGATIVE_WORDS),
            positive_reactions: owned(POSITIVE_REACTIONS),
            negative_reactions: owned(NEGATIVE_REACTIONS),
            neutral_reactions: owned(NEUTRAL_REACTIONS),
        }
    }
}

impl SentimentLexicon {
    /// Classify lowercase `text` by counting list words it contains.
    ///
    /// Each word counts at most once, and containment is plain substring
    /// ("bad" matches inside "badge").
    pub fn classify(&self, text: &str) -> Sentiment {
        let positive = count_hits(&self.positive_words, text);
        let negative = count_hits(&self.negative_words, text);

        if positive > negative {
            Sentiment::Positive
        } else if negative > positive {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Pick reactions for lowercase `text`.
    ///
    /// Positive and neutral sample without replacement; negative is the
    /// fixed prefix of its pool and does not consume randomness.
    pub fn reactions(
        &self,
        text: &str,
        max_emojis: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, MappingError> {
        let sentiment = self.classify(text);
        tracing::debug!(?sentiment, "Falling back to sentiment reactions");

        match sentiment {
            Sentiment::Positive => random::sample(rng, &self.positive_reactions, max_emojis),
            Sentiment::Negative => Ok(self
                .negative_reactions
                .iter()
                .take(max_emojis)
                .cloned()
                .collect()),
            Sentiment::Neutral => random::sample(rng, &self.neutral_reactions, max_emojis),
        }
    }
}

fn count_hits(words: &[String], text: &str) -> usize {
    words.iter().filter(|w| text.contains(w.as_str())).count()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
