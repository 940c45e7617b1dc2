//! `qenrich probe`: try the annotator on a few quotes without touching the
//! dataset.

use std::time::Duration;

use anyhow::Result;
use quote_enrich_core::models::Quote;

use crate::annotator::create_annotator;
use crate::config::Config;
use crate::pipeline::{BatchPipeline, Pacer, PipelineSettings, TokioPacer};
use crate::progress::NoProgress;

/// Pause between probe calls.
pub const PROBE_DELAY: Duration = Duration::from_secs(1);

/// Built-in probe quotes.
pub fn sample_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "In the end the shape and form don't matter at all, it's only the soul that matters, right? Nothing else.",
            "Soul Eater",
            "Soul Eater",
        ),
        Quote::new(
            "Never trust anyone too much... Remember the devil was once an angel...",
            "Kaneki Ken",
            "Tokyo Ghoul √A",
        ),
        Quote::new(
            "If I try, I fail. If i don't try i'm never going to get it.",
            "Aang",
            "Avatar: The Last Airbender",
        ),
    ]
}

/// Annotate `quotes` one at a time with a pause between calls.
pub async fn probe_quotes(
    pipeline: &BatchPipeline<'_>,
    pacer: &dyn Pacer,
    quotes: Vec<Quote>,
    delay: Duration,
) -> Vec<Quote> {
    let mut results = Vec::with_capacity(quotes.len());
    for (i, quote) in quotes.into_iter().enumerate() {
        if i > 0 {
            pacer.pause(delay).await;
        }
        let annotation = pipeline.annotate_one(&quote).await;
        results.push(quote.enrich(annotation));
    }
    results
}

pub async fn run_probe(
    config: &Config,
    quote: Option<String>,
    character: Option<String>,
    anime: Option<String>,
) -> Result<()> {
    let annotator = create_annotator(&config.annotator)?;
    let pacer = TokioPacer;
    let pipeline = BatchPipeline::new(
        annotator.as_ref(),
        &pacer,
        &NoProgress,
        PipelineSettings::from_config(config),
    );

    let quotes = match quote {
        Some(text) => vec![Quote::new(
            text,
            character.unwrap_or_else(|| "Unknown".to_string()),
            anime.unwrap_or_else(|| "Unknown".to_string()),
        )],
        None => sample_quotes(),
    };

    println!(
        "Probing {} with {} quote(s)...",
        annotator.model_name(),
        quotes.len()
    );
    println!();

    let results = probe_quotes(&pipeline, &pacer, quotes, PROBE_DELAY).await;
    let defaulted = results.iter().filter(|q| q.is_defaulted()).count();
    for (i, q) in results.iter().enumerate() {
        println!("Quote {}: \"{}\"", i + 1, q.quote);
        println!("  Character:       {}", q.character);
        println!("  Anime:           {}", q.anime);
        println!(
            "  Sentiment score: {}/10",
            q.sentiment_score.unwrap_or_default()
        );
        println!(
            "  Sentiment label: {}",
            q.sentiment_label.as_deref().unwrap_or("-")
        );
        println!("  Tags:            {}", q.tag_list().join(", "));
        println!("  Emotion:         {}", q.emotion.as_deref().unwrap_or("-"));
        if q.is_defaulted() {
            println!("  Status:          defaulted (see log for the failure)");
        }
        println!();
    }

    if defaulted == results.len() && !results.is_empty() {
        anyhow::bail!("every probe call failed; check the API key and [annotator] settings");
    }
    Ok(())
}
