//! Completion-API annotators.
//!
//! [`OpenAIAnnotator`] sends one chat-completions request per quote with the
//! fixed system instruction and the per-quote prompt from
//! [`quote_enrich_core::annotate::build_prompt`], then parses the first
//! choice's content with [`parse_analysis`]. It makes a single attempt; the
//! pipeline turns any failure into the default analysis.
//!
//! Use [`create_annotator`] to build the annotator selected by
//! `[annotator] provider`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use quote_enrich_core::annotate::{
    build_prompt, parse_analysis, AnnotateError, Analysis, Annotator, QuoteText, SYSTEM_PROMPT,
};
use quote_enrich_core::error::EnrichError;
use serde::{Deserialize, Serialize};

use crate::config::AnnotatorConfig;

/// Environment variable holding the completion API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Build the annotator named by `config.provider`.
///
/// Fails when the provider is `disabled` or when the credential is missing,
/// before any record is touched.
pub fn create_annotator(config: &AnnotatorConfig) -> Result<Box<dyn Annotator>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIAnnotator::from_env(config)?)),
        "disabled" => bail!("Annotator provider is disabled. Set [annotator] provider = \"openai\"."),
        other => bail!("Unknown annotator provider: {}", other),
    }
}

/// Annotator backed by an OpenAI-compatible `POST /chat/completions`.
pub struct OpenAIAnnotator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    endpoint: String,
}

impl OpenAIAnnotator {
    /// Read the credential from `OPENAI_API_KEY`.
    pub fn from_env(config: &AnnotatorConfig) -> Result<Self> {
        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(EnrichError::Config(format!(
                    "{} environment variable not set; export {}=<your key> and run again",
                    API_KEY_ENV, API_KEY_ENV
                ))
                .into())
            }
        };
        Self::new(config, api_key)
    }

    pub fn new(config: &AnnotatorConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build completion HTTP client")?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Annotator for OpenAIAnnotator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, quote: QuoteText<'_>) -> Result<Analysis, AnnotateError> {
        let prompt = build_prompt(quote);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnnotateError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AnnotateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AnnotateError::Decode(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnnotateError::Decode("response has no message content".to_string()))?;

        parse_analysis(&content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
