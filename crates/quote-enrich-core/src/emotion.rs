//! Tag → emotion classification.
//!
//! The keyword and sentiment tables below are the only copy in the
//! codebase; both the full analysis pipeline and the emotion-only pipeline
//! call [`derive_emotion`]. Bump [`EMOTION_TABLE_VERSION`] whenever a table
//! entry changes so manifests record which mapping produced a dataset.
//!
//! # Algorithm
//!
//! ```text
//! for tag in tags (input order):
//!     if TAG_EMOTIONS[lowercase(tag)] exists → return it
//! if SENTIMENT_EMOTIONS[label] exists        → return it
//! return Neutral
//! ```
//!
//! First match wins. There is no scoring and no voting across tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version of the mapping tables in this module.
pub const EMOTION_TABLE_VERSION: u32 = 1;

/// The closed emotion vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Romantic,
    Melancholic,
    Warm,
    Tragic,
    Inspiring,
    Philosophical,
    Terrifying,
    Dark,
    Joyful,
    Furious,
    Intense,
    Hopeful,
    Mysterious,
    Serene,
    Energetic,
    Humorous,
    Nostalgic,
    Noble,
    Ambitious,
    Liberating,
    Futuristic,
    Spiritual,
    Reflective,
    Complex,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 25] = [
        Emotion::Romantic,
        Emotion::Melancholic,
        Emotion::Warm,
        Emotion::Tragic,
        Emotion::Inspiring,
        Emotion::Philosophical,
        Emotion::Terrifying,
        Emotion::Dark,
        Emotion::Joyful,
        Emotion::Furious,
        Emotion::Intense,
        Emotion::Hopeful,
        Emotion::Mysterious,
        Emotion::Serene,
        Emotion::Energetic,
        Emotion::Humorous,
        Emotion::Nostalgic,
        Emotion::Noble,
        Emotion::Ambitious,
        Emotion::Liberating,
        Emotion::Futuristic,
        Emotion::Spiritual,
        Emotion::Reflective,
        Emotion::Complex,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Romantic => "Romantic",
            Emotion::Melancholic => "Melancholic",
            Emotion::Warm => "Warm",
            Emotion::Tragic => "Tragic",
            Emotion::Inspiring => "Inspiring",
            Emotion::Philosophical => "Philosophical",
            Emotion::Terrifying => "Terrifying",
            Emotion::Dark => "Dark",
            Emotion::Joyful => "Joyful",
            Emotion::Furious => "Furious",
            Emotion::Intense => "Intense",
            Emotion::Hopeful => "Hopeful",
            Emotion::Mysterious => "Mysterious",
            Emotion::Serene => "Serene",
            Emotion::Energetic => "Energetic",
            Emotion::Humorous => "Humorous",
            Emotion::Nostalgic => "Nostalgic",
            Emotion::Noble => "Noble",
            Emotion::Ambitious => "Ambitious",
            Emotion::Liberating => "Liberating",
            Emotion::Futuristic => "Futuristic",
            Emotion::Spiritual => "Spiritual",
            Emotion::Reflective => "Reflective",
            Emotion::Complex => "Complex",
            Emotion::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown emotion: '{}'", s))
    }
}

/// The sentiment labels the completion prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 4] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Mixed,
    ];

    /// Exact (case-sensitive) match against the lowercase label names.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            "mixed" => Some(SentimentLabel::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Mixed => "mixed",
        }
    }

    /// Emotion used when none of a quote's tags is in the keyword table.
    pub fn fallback_emotion(&self) -> Emotion {
        match self {
            SentimentLabel::Positive => Emotion::Inspiring,
            SentimentLabel::Neutral => Emotion::Reflective,
            SentimentLabel::Negative => Emotion::Tragic,
            SentimentLabel::Mixed => Emotion::Complex,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Emotion::*;

/// Lower-case keyword → emotion.
pub const TAG_EMOTIONS: &[(&str, Emotion)] = &[
    // love and relationships
    ("love", Romantic),
    ("romance", Romantic),
    ("heartbreak", Melancholic),
    ("friendship", Warm),
    ("family", Warm),
    ("betrayal", Tragic),
    // courage and determination
    ("courage", Inspiring),
    ("bravery", Inspiring),
    ("determination", Inspiring),
    ("perseverance", Inspiring),
    ("strength", Inspiring),
    ("heroism", Inspiring),
    // wisdom and philosophy
    ("wisdom", Philosophical),
    ("philosophy", Philosophical),
    ("truth", Philosophical),
    ("meaning", Philosophical),
    ("life", Philosophical),
    ("existence", Philosophical),
    // fear and darkness
    ("fear", Terrifying),
    ("horror", Terrifying),
    ("death", Tragic),
    ("despair", Melancholic),
    ("darkness", Dark),
    ("evil", Dark),
    // joy
    ("joy", Joyful),
    ("happiness", Joyful),
    ("laughter", Joyful),
    ("celebration", Joyful),
    ("success", Joyful),
    // anger and conflict
    ("anger", Furious),
    ("rage", Furious),
    ("war", Intense),
    ("battle", Intense),
    ("conflict", Intense),
    // sadness and loss
    ("sadness", Melancholic),
    ("grief", Melancholic),
    ("loss", Melancholic),
    ("pain", Melancholic),
    ("suffering", Melancholic),
    // hope
    ("hope", Hopeful),
    ("optimism", Hopeful),
    ("dreams", Hopeful),
    ("future", Hopeful),
    // mystery
    ("mystery", Mysterious),
    ("secrets", Mysterious),
    ("intrigue", Mysterious),
    ("deception", Mysterious),
    // peace
    ("peace", Serene),
    ("calm", Serene),
    ("tranquility", Serene),
    ("meditation", Serene),
    // excitement
    ("excitement", Energetic),
    ("adventure", Energetic),
    ("thrill", Energetic),
    ("passion", Energetic),
    // humor
    ("humor", Humorous),
    ("comedy", Humorous),
    ("funny", Humorous),
    ("wit", Humorous),
    // nostalgia
    ("memories", Nostalgic),
    ("past", Nostalgic),
    ("childhood", Nostalgic),
    ("nostalgia", Nostalgic),
    // justice and morality
    ("justice", Noble),
    ("morality", Noble),
    ("honor", Noble),
    ("duty", Noble),
    ("sacrifice", Noble),
    // power and ambition
    ("power", Ambitious),
    ("ambition", Ambitious),
    ("leadership", Ambitious),
    ("control", Ambitious),
    // freedom
    ("freedom", Liberating),
    ("rebellion", Liberating),
    ("independence", Liberating),
    ("liberation", Liberating),
    // nature and beauty
    ("nature", Serene),
    ("beauty", Serene),
    ("art", Serene),
    ("music", Serene),
    // technology and science
    ("technology", Futuristic),
    ("science", Futuristic),
    ("innovation", Futuristic),
    ("progress", Futuristic),
    // spirituality
    ("spirituality", Spiritual),
    ("religion", Spiritual),
    ("faith", Spiritual),
    ("soul", Spiritual),
    ("divine", Spiritual),
    // time and change
    ("time", Reflective),
    ("change", Reflective),
    ("growth", Reflective),
    ("transformation", Reflective),
    // fate
    ("fate", Mysterious),
    ("destiny", Mysterious),
    ("prophecy", Mysterious),
    ("fortune", Mysterious),
];

/// Look up a single tag (case-insensitive).
pub fn tag_emotion(tag: &str) -> Option<Emotion> {
    let key = tag.to_lowercase();
    TAG_EMOTIONS
        .iter()
        .find(|(keyword, _)| *keyword == key)
        .map(|(_, emotion)| *emotion)
}

/// Map a sentiment label and tag list to a single emotion.
///
/// Total over its inputs: anything unmatched resolves to a default.
pub fn derive_emotion<S: AsRef<str>>(sentiment_label: &str, tags: &[S]) -> Emotion {
    tags.iter()
        .find_map(|tag| tag_emotion(tag.as_ref()))
        .or_else(|| SentimentLabel::parse(sentiment_label).map(|s| s.fallback_emotion()))
        .unwrap_or(Emotion::Neutral)
}
