//! Batch enrichment pipeline.
//!
//! Quotes are annotated in contiguous groups of `batch_size`. Within a group
//! every call is dispatched concurrently and joined before the group
//! completes; groups run strictly in input order with a fixed pause between
//! them (never after the last). Output order always equals input order.
//!
//! ```text
//! [q0..q9] ──join_all──▶ merge ──▶ pause ──▶ [q10..q19] ──▶ … ──▶ [q20..q24] ──▶ done
//! ```
//!
//! Each call can additionally be throttled by a token bucket
//! (`requests_per_minute` / `burst`) and is bounded by the annotator
//! timeout. A failed, timed-out, or unparseable call never aborts the run:
//! the quote receives the default analysis and is marked `defaulted`.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use quote_enrich_core::annotate::{
    AnnotateError, Annotation, AnnotationStatus, Annotator, QuoteText,
};
use quote_enrich_core::models::Quote;

use crate::config::Config;
use crate::progress::{ProgressEvent, ProgressReporter};

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub call_timeout: Duration,
    pub progress_every: usize,
    pub requests_per_minute: Option<NonZeroU32>,
    pub burst: Option<NonZeroU32>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.pipeline.batch_size,
            batch_delay: Duration::from_millis(config.pipeline.batch_delay_ms),
            call_timeout: Duration::from_secs(config.annotator.timeout_secs),
            progress_every: config.pipeline.progress_every,
            requests_per_minute: config.pipeline.requests_per_minute.and_then(NonZeroU32::new),
            burst: config.pipeline.burst.and_then(NonZeroU32::new),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(2000),
            call_timeout: Duration::from_secs(30),
            progress_every: 1000,
            requests_per_minute: None,
            burst: None,
        }
    }
}

/// Group and pause counts for `total` quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub groups: usize,
    pub pauses: usize,
}

impl BatchPlan {
    pub fn new(total: usize, batch_size: usize) -> Self {
        let groups = total.div_ceil(batch_size.max(1));
        Self {
            groups,
            pauses: groups.saturating_sub(1),
        }
    }
}

/// Waits between groups. Swapped out in tests to count pauses without
/// sleeping.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct BatchPipeline<'a> {
    annotator: &'a dyn Annotator,
    pacer: &'a dyn Pacer,
    progress: &'a dyn ProgressReporter,
    limiter: Option<DefaultDirectRateLimiter>,
    settings: PipelineSettings,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(
        annotator: &'a dyn Annotator,
        pacer: &'a dyn Pacer,
        progress: &'a dyn ProgressReporter,
        settings: PipelineSettings,
    ) -> Self {
        let limiter = settings.requests_per_minute.map(|rpm| {
            let quota = Quota::per_minute(rpm).allow_burst(settings.burst.unwrap_or(rpm));
            RateLimiter::direct(quota)
        });
        Self {
            annotator,
            pacer,
            progress,
            limiter,
            settings,
        }
    }

    /// Enrich every quote.
    ///
    /// If the first quote already carries a sentiment score the input is
    /// returned unchanged without a single annotator call or pause.
    pub async fn process(&self, quotes: Vec<Quote>) -> Vec<Quote> {
        if quotes.first().is_some_and(Quote::has_sentiment) {
            tracing::info!("quotes already carry sentiment; nothing to annotate");
            return quotes;
        }

        let total = quotes.len();
        let batch_size = self.settings.batch_size.max(1);
        let plan = BatchPlan::new(total, batch_size);
        let progress_every = self.settings.progress_every.max(1);
        let mut next_mark = progress_every;
        let mut enriched = Vec::with_capacity(total);

        tracing::info!(
            quotes = total,
            groups = plan.groups,
            batch_size,
            model = self.annotator.model_name(),
            "starting annotation"
        );

        for (index, group) in quotes.chunks(batch_size).enumerate() {
            if index > 0 {
                self.pacer.pause(self.settings.batch_delay).await;
            }

            let annotations = join_all(group.iter().map(|q| self.annotate_one(q))).await;
            let defaulted = annotations
                .iter()
                .filter(|a| a.status == AnnotationStatus::Defaulted)
                .count();
            enriched.extend(
                group
                    .iter()
                    .cloned()
                    .zip(annotations)
                    .map(|(quote, annotation)| quote.enrich(annotation)),
            );

            tracing::debug!(
                group = index + 1,
                groups = plan.groups,
                size = group.len(),
                defaulted,
                "group complete"
            );
            self.progress.report(ProgressEvent::Group {
                group: (index + 1) as u64,
                groups: plan.groups as u64,
                n: enriched.len() as u64,
                total: total as u64,
            });
            if enriched.len() >= next_mark {
                self.progress.report(ProgressEvent::Annotated {
                    n: enriched.len() as u64,
                    total: total as u64,
                });
                while next_mark <= enriched.len() {
                    next_mark += progress_every;
                }
            }
        }

        enriched
    }

    /// Annotate one quote. Never fails: any error becomes the default
    /// analysis.
    pub async fn annotate_one(&self, quote: &Quote) -> Annotation {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let text = QuoteText {
            quote: &quote.quote,
            character: &quote.character,
            anime: &quote.anime,
        };
        let call = self.annotator.analyze(text);
        let result = match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AnnotateError::Timeout(self.settings.call_timeout)),
        };

        if let Err(e) = &result {
            tracing::warn!(
                object_id = quote.object_id.as_deref().unwrap_or("-"),
                character = %quote.character,
                error = %e,
                "annotation failed; using default analysis"
            );
        }
        Annotation::from_result(result)
    }
}
