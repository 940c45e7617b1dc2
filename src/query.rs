//! `qenrich query`: filter and page through the local dataset.

use anyhow::{bail, Result};
use quote_enrich_core::emotion::{Emotion, SentimentLabel};
use quote_enrich_core::explore::{paginate, QueryFilter};
use quote_enrich_core::models::Quote;
use quote_enrich_core::store::DatasetStore;

use crate::config::Config;
use crate::dataset::FileStore;

/// Validate user-supplied filter values against the closed vocabularies.
///
/// Emotion names are matched case-insensitively and normalized to their
/// canonical spelling; sentiment labels must be lowercase as stored.
pub fn normalize_filter(mut filter: QueryFilter) -> Result<QueryFilter> {
    if let Some(emotion) = filter.emotion.take() {
        match emotion.parse::<Emotion>() {
            Ok(e) => filter.emotion = Some(e.to_string()),
            Err(_) => bail!("Unknown emotion: '{}'", emotion),
        }
    }
    if let Some(label) = &filter.sentiment {
        if SentimentLabel::parse(label).is_none() {
            bail!(
                "Unknown sentiment label: '{}'. Must be positive, negative, neutral, or mixed.",
                label
            );
        }
    }
    if let (Some(min), Some(max)) = (filter.min_score, filter.max_score) {
        if min > max {
            bail!("--min-score ({}) must not exceed --max-score ({})", min, max);
        }
    }
    Ok(filter)
}

pub async fn run_query(
    config: &Config,
    filter: QueryFilter,
    page: usize,
    per_page: usize,
    json: bool,
) -> Result<()> {
    let filter = normalize_filter(filter)?;
    let store = FileStore::new(&config.dataset);
    let quotes = store.load().await?;
    let hits: Vec<&Quote> = filter.apply(&quotes);
    let result = paginate(&hits, page, per_page);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.nb_hits == 0 {
        println!("No quotes match.");
        return Ok(());
    }

    for q in &result.hits {
        println!(
            "{}  \"{}\"",
            q.object_id.as_deref().unwrap_or("-"),
            q.quote
        );
        println!("    {} — {}", q.character, q.anime);
        if q.has_sentiment() {
            println!(
                "    {} {}/10  {}  [{}]",
                q.sentiment_label.as_deref().unwrap_or("-"),
                q.sentiment_score.unwrap_or_default(),
                q.emotion.as_deref().unwrap_or("-"),
                q.tag_list().join(", ")
            );
        }
        println!();
    }
    println!(
        "page {} of {}  ({} hits, {} per page)",
        result.page + 1,
        result.nb_pages.max(1),
        result.nb_hits,
        result.hits_per_page
    );
    Ok(())
}
