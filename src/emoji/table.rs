//! Keyword table — lowercase search term to a pool of candidate emoji.

use crate::error::MappingError;

/// Built-in mappings, in match order.
const DEFAULT_MAPPINGS: &[(&str, &[&str])] = &[
    // Animals
    ("cat", &["🐱", "😸", "😻", "🙀"]),
    ("dog", &["🐶", "🐕", "🦮", "🐕‍🦺"]),
    ("bird", &["🐦", "🦅", "🦆", "🐧"]),
    ("fish", &["🐟", "🐠", "🐡", "🦈"]),
    ("horse", &["🐴", "🐎", "🦄"]),
    ("cow", &["🐄", "🐮"]),
    ("pig", &["🐷", "🐖"]),
    ("monkey", &["🐵", "🐒"]),
    ("lion", &["🦁"]),
    ("tiger", &["🐯"]),
    ("bear", &["🐻", "🧸"]),
    ("panda", &["🐼"]),
    ("rabbit", &["🐰", "🐇"]),
    ("fox", &["🦊"]),
    ("wolf", &["🐺"]),
    ("frog", &["🐸"]),
    ("turtle", &["🐢"]),
    ("snake", &["🐍"]),
    ("dragon", &["🐉", "🐲"]),
    ("unicorn", &["🦄"]),

    // Food & Drink
    ("pizza", &["🍕"]),
    ("burger", &["🍔"]),
    ("food", &["🍽️", "😋", "🤤"]),
    ("cake", &["🎂", "🧁"]),
    ("coffee", &["☕", "☕️"]),
    ("beer", &["🍺", "🍻"]),
    ("wine", &["🍷", "🍾"]),
    ("ice cream", &["🍦", "🍨"]),
    ("fruit", &["🍎", "🍊", "🍌", "🍇"]),
    ("apple", &["🍎"]),
    ("banana", &["🍌"]),
    ("orange", &["🍊"]),
    ("strawberry", &["🍓"]),
    ("bread", &["🍞", "🥖"]),
    ("meat", &["🥩", "🍖"]),
    ("chicken", &["🍗"]),
    ("egg", &["🥚", "🍳"]),
    ("pasta", &["🍝"]),
    ("soup", &["🍲"]),
    ("salad", &["🥗"]),

    // Nature & Weather
    ("sun", &["☀️", "🌞"]),
    ("moon", &["🌙", "🌛", "🌜"]),
    ("star", &["⭐", "🌟", "✨"]),
    ("cloud", &["☁️", "⛅"]),
    ("rain", &["🌧️", "☔", "💧"]),
    ("snow", &["❄️", "⛄", "🌨️"]),
    ("rainbow", &["🌈"]),
    ("flower", &["🌸", "🌺", "🌻", "🌷", "🌹"]),
    ("tree", &["🌳", "🌲", "🎋"]),
    ("mountain", &["⛰️", "🏔️"]),
    ("ocean", &["🌊", "🏖️"]),
    ("beach", &["🏖️", "🌊"]),
    ("fire", &["🔥", "🚒"]),
    ("water", &["💧", "🌊"]),
    ("earth", &["🌍", "🌎", "🌏"]),

    // Activities & Sports
    ("sport", &["⚽", "🏀", "🏈", "⚾", "🎾"]),
    ("football", &["⚽", "🏈"]),
    ("basketball", &["🏀"]),
    ("tennis", &["🎾"]),
    ("swimming", &["🏊‍♂️", "🏊‍♀️", "🌊"]),
    ("running", &["🏃‍♂️", "🏃‍♀️", "💨"]),
    ("cycling", &["🚴‍♂️", "🚴‍♀️", "🚲"]),
    ("dancing", &["💃", "🕺"]),
    ("music", &["🎵", "🎶", "🎤", "🎸", "🎹"]),
    ("gaming", &["🎮", "🕹️"]),
    ("reading", &["📚", "📖"]),
    ("cooking", &["👨‍🍳", "👩‍🍳", "🍳"]),
    ("art", &["🎨", "🖼️", "✏️"]),
    ("photography", &["📸", "📷"]),

    // Emotions & Expressions
    ("happy", &["😊", "😄", "😁", "🙂", "😀"]),
    ("sad", &["😢", "😭", "☹️", "😞"]),
    ("angry", &["😠", "😡", "🤬"]),
    ("love", &["❤️", "💕", "💖", "💗", "💙", "💚", "💛", "🧡", "💜"]),
    ("heart", &["❤️", "💕", "💖", "💗"]),
    ("laugh", &["😂", "🤣", "😆"]),
    ("surprise", &["😮", "😲", "🤯"]),
    ("excited", &["🤩", "😍", "🥳"]),
    ("cool", &["😎", "🆒"]),
    ("amazing", &["🤩", "😍", "🔥", "💯"]),
    ("beautiful", &["😍", "🤩", "✨", "💖"]),
    ("cute", &["🥰", "😍", "🥺", "💕"]),

    // Transportation
    ("car", &["🚗", "🚙", "🏎️"]),
    ("truck", &["🚚", "🚛"]),
    ("plane", &["✈️", "🛩️"]),
    ("train", &["🚂", "🚆", "🚇"]),
    ("bus", &["🚌", "🚍"]),
    ("bike", &["🚴‍♂️", "🚴‍♀️", "🚲"]),
    ("motorcycle", &["🏍️"]),
    ("boat", &["⛵", "🚤", "🛥️"]),
    ("rocket", &["🚀"]),

    // Technology
    ("computer", &["💻", "🖥️"]),
    ("phone", &["📱", "☎️"]),
    ("camera", &["📸", "📷"]),
    ("robot", &["🤖"]),
    ("tech", &["⚡", "🔧", "⚙️"]),

    // Objects & Items
    ("book", &["📚", "📖"]),
    ("gift", &["🎁"]),
    ("money", &["💰", "💵", "💸"]),
    ("home", &["🏠", "🏡"]),
    ("building", &["🏢", "🏬", "🏭"]),
    ("school", &["🏫", "🎓"]),
    ("hospital", &["🏥", "⚕️"]),
    ("church", &["⛪", "🕌"]),
    ("flag", &["🏴", "🏳️"]),
    ("crown", &["👑"]),
    ("diamond", &["💎"]),
    ("key", &["🔑", "🗝️"]),
    ("lock", &["🔒", "🔓"]),
    ("tool", &["🔧", "🔨", "⚙️"]),

    // Colors
    ("red", &["❤️", "🔴", "🌹"]),
    ("blue", &["💙", "🔵", "🌀"]),
    ("green", &["💚", "🟢", "🌿"]),
    ("yellow", &["💛", "🟡", "⭐"]),
    ("purple", &["💜", "🟣", "🔮"]),
    ("orange", &["🧡", "🟠", "🍊"]),
    ("black", &["🖤", "⚫"]),
    ("white", &["🤍", "⚪"]),
    ("pink", &["🩷", "🌸", "🌺"]),

    // Time & Events
    ("birthday", &["🎂", "🥳", "🎉"]),
    ("party", &["🎉", "🥳", "🍾"]),
    ("celebration", &["🎉", "🥳", "🎊"]),
    ("wedding", &["💒", "👰", "🤵", "💍"]),
    ("christmas", &["🎄", "🎅", "🤶", "⛄"]),
    ("halloween", &["🎃", "👻", "🦇"]),
    ("new year", &["🎊", "🥂", "🎆"]),

    // Professions
    ("doctor", &["👨‍⚕️", "👩‍⚕️", "⚕️"]),
    ("teacher", &["👨‍🏫", "👩‍🏫", "📚"]),
    ("police", &["👮‍♂️", "👮‍♀️", "🚔"]),
    ("firefighter", &["👨‍🚒", "👩‍🚒", "🚒"]),
    ("chef", &["👨‍🍳", "👩‍🍳", "🍳"]),
    ("farmer", &["👨‍🌾", "👩‍🌾", "🚜"]),
];

/// Ordered mapping from lowercase keyword to a non-empty list of emoji.
///
/// Keys are always lowercase and every candidate list is non-empty; both
/// are enforced on insertion. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (keyword, emojis) in DEFAULT_MAPPINGS {
            table.upsert(
                keyword.to_string(),
                emojis.iter().map(|e| e.to_string()).collect(),
            );
        }
        table
    }

    /// Build a table from `(keyword, emojis)` pairs, validating each.
    pub fn from_pairs<I, K, E>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, Vec<E>)>,
        K: AsRef<str>,
        E: Into<String>,
    {
        let mut table = Self::empty();
        for (keyword, emojis) in pairs {
            table.add_mapping(keyword.as_ref(), emojis)?;
        }
        Ok(table)
    }

    /// Add or replace the mapping for `keyword`.
    ///
    /// An existing keyword keeps its position and gets the new candidates.
    pub fn add_mapping<E: Into<String>>(
        &mut self,
        keyword: &str,
        emojis: Vec<E>,
    ) -> Result<(), MappingError> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(MappingError::EmptyKeyword);
        }
        let emojis: Vec<String> = emojis.into_iter().map(Into::into).collect();
        if emojis.is_empty() {
            return Err(MappingError::EmptyCandidates { keyword });
        }

        tracing::info!(keyword = %keyword, emojis = ?emojis, "Added custom mapping");
        self.upsert(keyword, emojis);
        Ok(())
    }

    /// Remove the mapping for `keyword`. Returns whether one existed.
    pub fn remove_mapping(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != keyword);
        let removed = self.entries.len() != before;
        if removed {
            tracing::info!(keyword = %keyword, "Removed mapping");
        }
        removed
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.candidates(keyword).is_some()
    }

    /// Candidate emoji for `keyword` (case-insensitive lookup).
    pub fn candidates(&self, keyword: &str) -> Option<&[String]> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, emojis)| emojis.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keywords with their candidates, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, emojis)| (k.as_str(), emojis.as_slice()))
    }

    fn upsert(&mut self, keyword: String, emojis: Vec<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            Some((_, existing)) => *existing = emojis,
            None => self.entries.push((keyword, emojis)),
        }
    }
}
