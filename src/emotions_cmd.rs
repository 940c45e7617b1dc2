//! `qenrich emotions`: derive emotions for an already-analyzed dataset.
//!
//! No network calls. Uses the same tag table as `enrich`, so both paths
//! assign identical emotions to identical sentiment/tag pairs.

use anyhow::{Context, Result};
use quote_enrich_core::emotion::Emotion;
use quote_enrich_core::error::EnrichError;
use quote_enrich_core::explore::{emotion_distribution, Bucket};
use quote_enrich_core::models::{DatasetManifest, DatasetState, Quote};
use quote_enrich_core::store::DatasetStore;

use crate::config::Config;
use crate::dataset::{load_dataset, rendered_sha256, sha256_hex, FileStore, LoadedDataset, RunLock};
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::stats::print_buckets;

#[derive(Debug)]
pub enum EmotionsOutcome {
    /// Emotions already present; nothing was written.
    Skipped,
    Written { total: usize, emotions: Vec<Bucket> },
}

/// Derive and persist an emotion for every quote behind `store`.
///
/// Fails with [`EnrichError::Precondition`] (and writes nothing) when the
/// dataset has no sentiment fields yet.
pub async fn derive_dataset_emotions(
    store: &dyn DatasetStore,
    progress: &dyn ProgressReporter,
    progress_every: usize,
) -> Result<EmotionsOutcome> {
    let LoadedDataset { raw, quotes, state } = load_dataset(store).await?;

    match state {
        DatasetState::Raw => {
            return Err(EnrichError::precondition(
                format!("{} has no sentiment analysis", store.location()),
                "run `qenrich enrich` first",
            )
            .into())
        }
        DatasetState::Enriched => {
            tracing::info!(location = %store.location(), "emotions already present; skipping");
            return Ok(EmotionsOutcome::Skipped);
        }
        DatasetState::Analyzed => {}
    }

    store.backup(&raw).await.context("Failed to write backup")?;

    let total = quotes.len();
    let every = progress_every.max(1);
    let mut derived = Vec::with_capacity(total);
    for quote in quotes {
        derived.push(derive_one(quote));
        if derived.len() % every == 0 {
            progress.report(ProgressEvent::Deriving {
                n: derived.len() as u64,
                total: total as u64,
            });
        }
    }

    let written = rendered_sha256(&derived).context("Failed to render dataset")?;
    store.save(&derived).await.context("Failed to write dataset")?;
    let manifest = DatasetManifest::new(
        DatasetState::Enriched,
        &derived,
        sha256_hex(&raw),
        written,
    );
    store
        .save_manifest(&manifest)
        .await
        .context("Failed to write manifest")?;

    tracing::info!(records = total, "emotions derived");
    Ok(EmotionsOutcome::Written {
        total,
        emotions: emotion_distribution(&derived),
    })
}

fn derive_one(quote: Quote) -> Quote {
    if quote.is_defaulted() {
        Quote {
            emotion: Some(Emotion::Neutral.to_string()),
            ..quote
        }
    } else {
        quote.with_derived_emotion()
    }
}

/// CLI entry point for `qenrich emotions`.
pub async fn run_emotions(config: &Config, progress_mode: ProgressMode) -> Result<()> {
    let store = FileStore::new(&config.dataset);
    let _lock = RunLock::acquire(&config.dataset.lock_path())?;
    let reporter = progress_mode.reporter();

    match derive_dataset_emotions(&store, reporter.as_ref(), config.pipeline.progress_every).await? {
        EmotionsOutcome::Skipped => {
            println!(
                "{} already has emotions; nothing to do.",
                store.path().display()
            );
        }
        EmotionsOutcome::Written { total, emotions } => {
            println!("Backup written to {}", store.backup_path().display());
            println!(
                "Derived emotions for {} quotes in {}",
                total,
                store.path().display()
            );
            println!("Manifest written to {}", store.manifest_path().display());
            println!();
            println!("Emotion distribution:");
            print_buckets(&emotions);
        }
    }
    Ok(())
}
