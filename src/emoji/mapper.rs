//! Content classifier — maps free-text image analysis to emoji reactions.
//!
//! Flow:
//! 1. Empty text → fixed fallback prefix
//! 2. Keyword substring scan → one random candidate per matched keyword
//! 3. Down-sample to `max_emojis` without replacement
//! 4. No matches → sentiment fallback
//!
//! Any internal failure degrades to the fixed fallback prefix and is never
//! surfaced to the caller.

use tracing::{debug, error};

use crate::emoji::random::{self, RandomSource};
use crate::emoji::sentiment::SentimentLexicon;
use crate::emoji::table::KeywordTable;
use crate::error::MappingError;

/// Default cap on reactions per image.
pub const DEFAULT_MAX_EMOJIS: usize = 3;

const FALLBACK_EMOJIS: &[&str] = &["👀", "😊", "👍", "✨"];

/// Keyword classifier with sentiment fallback.
#[derive(Debug, Clone)]
pub struct EmojiMapper {
    table: KeywordTable,
    lexicon: SentimentLexicon,
    fallback: Vec<String>,
}

impl Default for EmojiMapper {
    fn default() -> Self {
        Self::new(KeywordTable::builtin(), SentimentLexicon::default())
    }
}

impl EmojiMapper {
    pub fn new(table: KeywordTable, lexicon: SentimentLexicon) -> Self {
        Self {
            table,
            lexicon,
            fallback: FALLBACK_EMOJIS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut KeywordTable {
        &mut self.table
    }

    /// First `max_emojis` entries of the fixed fallback list.
    pub fn fallback(&self, max_emojis: usize) -> Vec<String> {
        self.fallback.iter().take(max_emojis).cloned().collect()
    }

    /// Pick up to `max_emojis` distinct emoji for `analysis_text`.
    ///
    /// Output is non-deterministic unless `rng` is. Only returns an empty
    /// list when `max_emojis` is zero.
    pub fn emojis_for(
        &self,
        analysis_text: &str,
        max_emojis: usize,
        rng: &mut dyn RandomSource,
    ) -> Vec<String> {
        if analysis_text.is_empty() {
            return self.fallback(max_emojis);
        }

        match self.try_emojis_for(analysis_text, max_emojis, rng) {
            Ok(emojis) => emojis,
            Err(e) => {
                error!(error = %e, "Error mapping emojis, using fallback");
                self.fallback(max_emojis)
            }
        }
    }

    fn try_emojis_for(
        &self,
        analysis_text: &str,
        max_emojis: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, MappingError> {
        let text = analysis_text.to_lowercase();
        let matched = self.keyword_matches(&text, rng)?;

        if matched.is_empty() {
            return self.lexicon.reactions(&text, max_emojis, rng);
        }

        if matched.len() > max_emojis {
            return random::sample(rng, &matched, max_emojis);
        }
        Ok(matched)
    }

    /// One random candidate per keyword contained in `text`, deduplicated.
    fn keyword_matches(
        &self,
        text: &str,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, MappingError> {
        let mut matched: Vec<String> = Vec::new();

        for (keyword, candidates) in self.table.iter() {
            if !text.contains(keyword) {
                continue;
            }
            let Some(emoji) = random::choose(rng, candidates)? else {
                continue;
            };
            debug!(keyword, emoji = %emoji, "Matched keyword");
            if !matched.contains(emoji) {
                matched.push(emoji.clone());
            }
        }

        Ok(matched)
    }
}
