//! Core data types: quotes, their enrichment fields, and the dataset manifest.
//!
//! A [`Quote`] is serialized with the exact field names of the dataset file
//! (`objectID`, `sentiment_score`, …). Fields this crate does not know about
//! are kept in [`Quote::extra`] so that rewriting the dataset never drops
//! data.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::annotate::{Analysis, Annotation, AnnotationStatus};
use crate::emotion::{derive_emotion, Emotion, EMOTION_TABLE_VERSION};

/// A single record of the quote dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "objectID", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub quote: String,
    pub character: String,
    pub anime: String,
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_status: Option<AnnotationStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Quote {
    /// An unenriched quote.
    pub fn new(
        quote: impl Into<String>,
        character: impl Into<String>,
        anime: impl Into<String>,
    ) -> Self {
        Self {
            object_id: None,
            quote: quote.into(),
            character: character.into(),
            anime: anime.into(),
            sentiment_score: None,
            sentiment_label: None,
            tags: None,
            emotion: None,
            annotation_status: None,
            extra: Map::new(),
        }
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn has_sentiment(&self) -> bool {
        self.sentiment_score.is_some()
    }

    pub fn has_emotion(&self) -> bool {
        self.emotion.is_some()
    }

    /// Tags, or an empty slice for unenriched records.
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Merge an annotation into this quote, producing a fully enriched record.
    ///
    /// Real analyses get their emotion from [`derive_emotion`]; defaulted
    /// ones are pinned to [`Emotion::Neutral`] so fallbacks never masquerade
    /// as a classified mood.
    pub fn enrich(self, annotation: Annotation) -> Self {
        let emotion = match annotation.status {
            AnnotationStatus::Ok => derive_emotion(
                &annotation.analysis.sentiment_label,
                &annotation.analysis.tags,
            ),
            AnnotationStatus::Defaulted => Emotion::Neutral,
        };
        let Analysis {
            sentiment_score,
            sentiment_label,
            tags,
        } = annotation.analysis;
        Self {
            sentiment_score: Some(sentiment_score),
            sentiment_label: Some(sentiment_label),
            tags: Some(tags),
            emotion: Some(emotion.to_string()),
            annotation_status: Some(annotation.status),
            ..self
        }
    }

    /// Derive the emotion from the sentiment fields already present.
    pub fn with_derived_emotion(self) -> Self {
        let emotion = derive_emotion(self.sentiment_label.as_deref().unwrap_or(""), self.tag_list());
        Self {
            emotion: Some(emotion.to_string()),
            ..self
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.annotation_status == Some(AnnotationStatus::Defaulted)
    }
}

/// Accept any JSON number as a score. Files written by older analysis runs
/// stored the model's value as-is, so fractional scores such as `7.5` occur;
/// they are rounded the same way [`crate::annotate::parse_analysis`] rounds.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<Number>::deserialize(deserializer)?;
    Ok(number.and_then(|n| {
        n.as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
    }))
}

/// How far a dataset has progressed through enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetState {
    /// No sentiment fields.
    Raw,
    /// Sentiment and tags present, emotion missing (output of older runs).
    Analyzed,
    /// Sentiment, tags and emotion present.
    Enriched,
}

impl DatasetState {
    /// Infer the state from the first record only.
    ///
    /// The whole collection is assumed to share the first record's state;
    /// partially-enriched collections are not detected.
    pub fn sample(quotes: &[Quote]) -> Self {
        match quotes.first() {
            Some(q) if q.has_sentiment() && q.has_emotion() => DatasetState::Enriched,
            Some(q) if q.has_sentiment() => DatasetState::Analyzed,
            _ => DatasetState::Raw,
        }
    }

    /// Resolve the state, preferring the manifest when it describes the
    /// current dataset bytes (`dataset_sha256` is the digest of those bytes).
    /// A missing or stale manifest falls back to [`DatasetState::sample`].
    pub fn detect(
        quotes: &[Quote],
        manifest: Option<&DatasetManifest>,
        dataset_sha256: &str,
    ) -> Self {
        match manifest {
            Some(m) if m.describes(dataset_sha256) => m.state,
            _ => Self::sample(quotes),
        }
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetState::Raw => "raw",
            DatasetState::Analyzed => "analyzed",
            DatasetState::Enriched => "enriched",
        };
        f.write_str(s)
    }
}

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Dataset-level metadata written next to the dataset after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub schema_version: u32,
    pub state: DatasetState,
    pub emotion_table_version: u32,
    pub record_count: usize,
    pub defaulted_count: usize,
    /// Hex SHA-256 of the bytes captured in the backup file.
    pub source_sha256: String,
    /// Hex SHA-256 of the dataset bytes written alongside this manifest.
    /// Empty in manifests from before it was recorded; those never match.
    #[serde(default)]
    pub dataset_sha256: String,
    pub updated_at: DateTime<Utc>,
}

impl DatasetManifest {
    pub fn new(
        state: DatasetState,
        quotes: &[Quote],
        source_sha256: String,
        dataset_sha256: String,
    ) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            state,
            emotion_table_version: EMOTION_TABLE_VERSION,
            record_count: quotes.len(),
            defaulted_count: quotes.iter().filter(|q| q.is_defaulted()).count(),
            source_sha256,
            dataset_sha256,
            updated_at: Utc::now(),
        }
    }

    /// Whether this manifest was written for the dataset with this digest.
    pub fn describes(&self, dataset_sha256: &str) -> bool {
        !self.dataset_sha256.is_empty() && self.dataset_sha256 == dataset_sha256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_seed_record_keeps_unknown_fields() {
        let json = r#"{"objectID":"42","quote":"A","character":"X","anime":"Y","source":"seed"}"#;
        let q: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(q.object_id.as_deref(), Some("42"));
        assert!(!q.has_sentiment());
        assert_eq!(q.extra.get("source"), Some(&Value::from("seed")));

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["source"], "seed");
        assert!(back.get("sentiment_score").is_none());
        assert!(back.get("emotion").is_none());
    }

    #[test]
    fn enrich_sets_all_four_fields() {
        let q = Quote::new("A", "X", "Y").enrich(Annotation::ok(Analysis {
            sentiment_score: 9,
            sentiment_label: "positive".into(),
            tags: vec!["courage".into(), "love".into()],
        }));
        assert_eq!(q.sentiment_score, Some(9));
        assert_eq!(q.sentiment_label.as_deref(), Some("positive"));
        assert_eq!(q.tag_list(), ["courage", "love"]);
        assert_eq!(q.emotion.as_deref(), Some("Inspiring"));
        assert_eq!(q.annotation_status, Some(AnnotationStatus::Ok));
    }

    #[test]
    fn enrich_with_fallback_is_neutral() {
        let q = Quote::new("A", "X", "Y").enrich(Annotation::defaulted());
        assert_eq!(q.sentiment_score, Some(5));
        assert_eq!(q.sentiment_label.as_deref(), Some("neutral"));
        assert_eq!(q.tag_list(), ["general"]);
        assert_eq!(q.emotion.as_deref(), Some("Neutral"));
        assert!(q.is_defaulted());
    }

    #[test]
    fn sample_uses_first_record_only() {
        let raw = Quote::new("A", "X", "Y");
        let analyzed = Quote {
            sentiment_score: Some(3),
            sentiment_label: Some("negative".into()),
            tags: Some(vec!["loss".into()]),
            ..Quote::new("B", "X", "Y")
        };
        let enriched = analyzed.clone().with_derived_emotion();

        assert_eq!(DatasetState::sample(&[]), DatasetState::Raw);
        assert_eq!(DatasetState::sample(&[raw.clone(), enriched.clone()]), DatasetState::Raw);
        assert_eq!(DatasetState::sample(&[analyzed.clone(), raw.clone()]), DatasetState::Analyzed);
        assert_eq!(DatasetState::sample(&[enriched, raw]), DatasetState::Enriched);
    }

    #[test]
    fn matching_manifest_overrides_sampling() {
        let quotes = vec![Quote::new("A", "X", "Y")];
        let manifest =
            DatasetManifest::new(DatasetState::Enriched, &quotes, "src".into(), "abc".into());
        assert_eq!(
            DatasetState::detect(&quotes, Some(&manifest), "abc"),
            DatasetState::Enriched
        );
        assert_eq!(DatasetState::detect(&quotes, None, "abc"), DatasetState::Raw);
    }

    #[test]
    fn stale_manifest_falls_back_to_sampling() {
        let quotes = vec![Quote::new("A", "X", "Y")];
        let manifest =
            DatasetManifest::new(DatasetState::Enriched, &quotes, "src".into(), "abc".into());
        assert_eq!(
            DatasetState::detect(&quotes, Some(&manifest), "def"),
            DatasetState::Raw
        );

        let legacy: DatasetManifest = serde_json::from_value(serde_json::json!({
            "schema_version": 1,
            "state": "enriched",
            "emotion_table_version": 1,
            "record_count": 1,
            "defaulted_count": 0,
            "source_sha256": "src",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(legacy.dataset_sha256.is_empty());
        assert_eq!(DatasetState::detect(&quotes, Some(&legacy), ""), DatasetState::Raw);
    }

    #[test]
    fn fractional_scores_are_rounded_on_load() {
        let json = r#"[
            {"quote":"A","character":"X","anime":"Y","sentiment_score":7.5,"sentiment_label":"positive","tags":["hope"]},
            {"quote":"B","character":"X","anime":"Y","sentiment_score":3.2},
            {"quote":"C","character":"X","anime":"Y","sentiment_score":null}
        ]"#;
        let quotes: Vec<Quote> = serde_json::from_str(json).unwrap();
        assert_eq!(quotes[0].sentiment_score, Some(8));
        assert_eq!(quotes[1].sentiment_score, Some(3));
        assert_eq!(quotes[2].sentiment_score, None);
        assert!(quotes[2].extra.is_empty());
    }

    #[test]
    fn with_derived_emotion_treats_missing_tags_as_empty() {
        let q = Quote {
            sentiment_score: Some(2),
            sentiment_label: Some("negative".into()),
            ..Quote::new("A", "X", "Y")
        }
        .with_derived_emotion();
        assert_eq!(q.emotion.as_deref(), Some("Tragic"));
    }
}
