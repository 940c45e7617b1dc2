//! Dataset statistics.
//!
//! Summarizes an enriched dataset: record and defaulted counts, average
//! sentiment score, per-label and per-emotion distributions, and tag
//! coverage. Used by `qenrich stats` and printed at the end of every
//! `qenrich enrich` run.

use anyhow::Result;
use quote_enrich_core::explore::{all_tags, summarize, Bucket, DatasetSummary};
use quote_enrich_core::store::DatasetStore;

use crate::config::Config;
use crate::dataset::FileStore;

/// Run the stats command: load the dataset and print a summary.
pub async fn run_stats(config: &Config, json: bool, list_tags: bool) -> Result<()> {
    let store = FileStore::new(&config.dataset);
    let quotes = store.load().await?;
    let manifest = store.load_manifest().await?;
    let summary = summarize(&quotes);

    if json {
        let mut out = serde_json::to_value(&summary)?;
        out["manifest"] = serde_json::to_value(&manifest)?;
        if list_tags {
            out["tags"] = serde_json::to_value(all_tags(&quotes))?;
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Quote Enrich — Dataset Stats");
    println!("============================");
    println!();
    println!("  Dataset:     {}", store.path().display());
    match &manifest {
        Some(m) => println!(
            "  State:       {} (emotion table v{}, updated {})",
            m.state,
            m.emotion_table_version,
            m.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("  State:       no manifest"),
    }
    println!();
    print_summary(&summary);

    if list_tags {
        println!();
        println!("All tags:");
        for tag in all_tags(&quotes) {
            println!("  {}", tag);
        }
    }
    Ok(())
}

pub fn print_summary(summary: &DatasetSummary) {
    println!("  Quotes:      {}", summary.total);
    println!("  Defaulted:   {}", summary.defaulted);
    match summary.average_score {
        Some(avg) => println!("  Avg score:   {:.2}", avg),
        None => println!("  Avg score:   -"),
    }

    if !summary.sentiment.is_empty() {
        println!();
        println!("Sentiment distribution:");
        print_buckets(&summary.sentiment);
    }
    if !summary.emotions.is_empty() {
        println!();
        println!("Emotion distribution:");
        print_buckets(&summary.emotions);
    }

    println!();
    println!("  Unique tags: {}", summary.unique_tags);
    if !summary.sample_tags.is_empty() {
        println!("  Sample tags: {}", summary.sample_tags.join(", "));
    }
}

pub fn print_buckets(buckets: &[Bucket]) {
    for b in buckets {
        println!("  {:<16} {:>7} ({:.1}%)", b.label, b.count, b.percent);
    }
}
