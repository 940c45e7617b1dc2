//! Annotator contract: prompt, response parsing, and the fallback result.
//!
//! An [`Annotator`] asks an external completion service to classify one
//! quote. Implementations report failures as [`AnnotateError`]; callers in
//! the pipeline convert any failure into [`Annotation::defaulted`], so the
//! error never leaves the single-quote boundary.
//!
//! Concrete implementations (OpenAI) live in the `quote-enrich` app crate.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// System instruction sent with every classification request.
pub const SYSTEM_PROMPT: &str = "You are an expert at analyzing anime quotes for sentiment and themes. \
Provide accurate, relevant analysis in the specified JSON format.";

pub const FALLBACK_SCORE: i64 = 5;
pub const FALLBACK_LABEL: &str = "neutral";
pub const FALLBACK_TAG: &str = "general";

/// Structured classification of a single quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// 1 (very negative) to 10 (very positive).
    pub sentiment_score: i64,
    pub sentiment_label: String,
    pub tags: Vec<String>,
}

impl Analysis {
    /// The fixed result used whenever classification fails.
    pub fn fallback() -> Self {
        Self {
            sentiment_score: FALLBACK_SCORE,
            sentiment_label: FALLBACK_LABEL.to_string(),
            tags: vec![FALLBACK_TAG.to_string()],
        }
    }
}

/// Whether a record's analysis came from the service or from the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    Ok,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub analysis: Analysis,
    pub status: AnnotationStatus,
}

impl Annotation {
    pub fn ok(analysis: Analysis) -> Self {
        Self {
            analysis,
            status: AnnotationStatus::Ok,
        }
    }

    pub fn defaulted() -> Self {
        Self {
            analysis: Analysis::fallback(),
            status: AnnotationStatus::Defaulted,
        }
    }

    /// Collapse an annotator result into an annotation that always exists.
    pub fn from_result(result: Result<Analysis, AnnotateError>) -> Self {
        match result {
            Ok(analysis) => Self::ok(analysis),
            Err(_) => Self::defaulted(),
        }
    }
}

/// Reasons a single classification call can fail.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode completion response: {0}")]
    Decode(String),

    #[error("completion content is not a valid analysis: {0}")]
    Parse(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Text of a quote as handed to an annotator.
#[derive(Debug, Clone, Copy)]
pub struct QuoteText<'a> {
    pub quote: &'a str,
    pub character: &'a str,
    pub anime: &'a str,
}

/// External classification service.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Identifier of the model behind this annotator (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Classify a single quote. A single attempt; no retries.
    async fn analyze(&self, quote: QuoteText<'_>) -> Result<Analysis, AnnotateError>;
}

/// Build the per-quote user prompt.
pub fn build_prompt(quote: QuoteText<'_>) -> String {
    format!(
        r#"Analyze the following anime quote and provide:
1. A sentiment score (1-10, where 1 is very negative, 5 is neutral, 10 is very positive)
2. A list of 3-5 relevant tags that describe the theme, emotion, or topic of the quote
3. A brief sentiment label (positive, negative, neutral, mixed)

Quote: "{}"
Character: {}
Anime: {}

Please respond in the following JSON format:
{{
  "sentiment_score": number,
  "sentiment_label": "string",
  "tags": ["tag1", "tag2", "tag3"]
}}"#,
        quote.quote, quote.character, quote.anime
    )
}

/// Parse completion content into an [`Analysis`].
///
/// The content must be a bare JSON object with `sentiment_score` (a number
/// in 1..=10; fractional values are rounded), `sentiment_label` (string),
/// and `tags` (array of strings). Anything else is an
/// [`AnnotateError::Parse`].
pub fn parse_analysis(content: &str) -> Result<Analysis, AnnotateError> {
    let json: Value = serde_json::from_str(content.trim())
        .map_err(|e| AnnotateError::Parse(format!("invalid JSON: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| AnnotateError::Parse("expected a JSON object".to_string()))?;

    let raw_score = obj
        .get("sentiment_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| AnnotateError::Parse("sentiment_score missing or not a number".to_string()))?;
    let sentiment_score = raw_score.round() as i64;
    if !(1..=10).contains(&sentiment_score) {
        return Err(AnnotateError::Parse(format!(
            "sentiment_score {} out of range 1-10",
            raw_score
        )));
    }

    let sentiment_label = obj
        .get("sentiment_label")
        .and_then(Value::as_str)
        .ok_or_else(|| AnnotateError::Parse("sentiment_label missing or not a string".to_string()))?
        .to_string();

    let tags = obj
        .get("tags")
        .and_then(Value::as_array)
        .ok_or_else(|| AnnotateError::Parse("tags missing or not an array".to_string()))?
        .iter()
        .map(|t| {
            t.as_str()
                .map(str::to_string)
                .ok_or_else(|| AnnotateError::Parse(format!("tag {} is not a string", t)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Analysis {
        sentiment_score,
        sentiment_label,
        tags,
    })
}
