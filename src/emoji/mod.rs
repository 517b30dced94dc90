//! Content-to-emoji mapping policy.
//!
//! - [`KeywordTable`]: lowercase keyword → candidate emoji
//! - [`EmojiMapper`]: keyword classifier, falls back to sentiment
//! - [`SentimentLexicon`]: positive/negative word lists and reaction pools
//! - [`RandomSource`]: injectable randomness for every random pick

pub mod mapper;
pub mod random;
pub mod sentiment;
pub mod table;

pub use mapper::{DEFAULT_MAX_EMOJIS, EmojiMapper};
pub use random::{FixedSequence, RandomSource, SystemRandom};
pub use sentiment::{Sentiment, SentimentLexicon};
pub use table::KeywordTable;
