//! `qenrich enrich`: annotate a raw dataset and write it back.
//!
//! Order of side effects on a full run:
//!
//! 1. read the canonical bytes and the manifest;
//! 2. skip (exit 0) when the dataset is already analyzed or enriched;
//! 3. annotate every quote through the [`BatchPipeline`];
//! 4. write the backup (the unmodified bytes from step 1);
//! 5. overwrite the canonical file;
//! 6. write the manifest.
//!
//! `--dry-run` stops after step 2 and reports the group plan. `--limit N`
//! annotates the first N quotes and prints them without writing anything.

use anyhow::{Context, Result};
use quote_enrich_core::explore::{summarize, DatasetSummary};
use quote_enrich_core::models::{DatasetManifest, DatasetState, Quote};
use quote_enrich_core::store::DatasetStore;

use crate::annotator::create_annotator;
use crate::config::Config;
use crate::dataset::{load_dataset, rendered_sha256, sha256_hex, FileStore, LoadedDataset, RunLock};
use crate::pipeline::{BatchPipeline, BatchPlan, PipelineSettings, TokioPacer};
use crate::progress::ProgressMode;
use crate::stats::print_summary;

/// What an `enrich` invocation did.
#[derive(Debug)]
pub enum EnrichOutcome {
    /// The dataset already carries sentiment; nothing was written.
    Skipped { state: DatasetState },
    /// Dry run: the plan a full run would follow.
    Planned { quotes: usize, plan: BatchPlan },
    /// Limited run: annotated quotes, not persisted.
    Preview(Vec<Quote>),
    /// Full run: backup, dataset and manifest were written.
    Written(DatasetSummary),
}

/// Report what a full run would do without calling the annotator.
pub async fn plan_dataset(store: &dyn DatasetStore, batch_size: usize) -> Result<EnrichOutcome> {
    let LoadedDataset { quotes, state, .. } = load_dataset(store).await?;
    if state >= DatasetState::Analyzed {
        return Ok(EnrichOutcome::Skipped { state });
    }
    Ok(EnrichOutcome::Planned {
        quotes: quotes.len(),
        plan: BatchPlan::new(quotes.len(), batch_size),
    })
}

/// Annotate the dataset behind `store`.
///
/// With `limit`, only the first `limit` quotes are annotated and nothing is
/// written.
pub async fn enrich_dataset(
    store: &dyn DatasetStore,
    pipeline: &BatchPipeline<'_>,
    limit: Option<usize>,
) -> Result<EnrichOutcome> {
    let LoadedDataset { raw, quotes, state } = load_dataset(store).await?;
    if state >= DatasetState::Analyzed {
        tracing::info!(%state, location = %store.location(), "dataset already annotated; skipping");
        return Ok(EnrichOutcome::Skipped { state });
    }

    if let Some(limit) = limit {
        let sample: Vec<Quote> = quotes.into_iter().take(limit).collect();
        return Ok(EnrichOutcome::Preview(pipeline.process(sample).await));
    }

    let enriched = pipeline.process(quotes).await;
    let written = rendered_sha256(&enriched).context("Failed to render dataset")?;

    store.backup(&raw).await.context("Failed to write backup")?;
    store.save(&enriched).await.context("Failed to write dataset")?;
    let manifest = DatasetManifest::new(
        DatasetState::Enriched,
        &enriched,
        sha256_hex(&raw),
        written,
    );
    store
        .save_manifest(&manifest)
        .await
        .context("Failed to write manifest")?;

    tracing::info!(
        records = manifest.record_count,
        defaulted = manifest.defaulted_count,
        "dataset enriched"
    );
    Ok(EnrichOutcome::Written(summarize(&enriched)))
}

/// CLI entry point for `qenrich enrich`.
pub async fn run_enrich(
    config: &Config,
    dry_run: bool,
    limit: Option<usize>,
    progress_mode: ProgressMode,
) -> Result<()> {
    let store = FileStore::new(&config.dataset);
    let settings = PipelineSettings::from_config(config);

    if dry_run {
        let outcome = plan_dataset(&store, settings.batch_size).await?;
        print_outcome(&store, &outcome, &settings);
        return Ok(());
    }

    // Credential check comes before the lock and before any read.
    let annotator = create_annotator(&config.annotator)?;

    let _lock = if limit.is_none() {
        Some(RunLock::acquire(&config.dataset.lock_path())?)
    } else {
        None
    };

    let pacer = TokioPacer;
    let reporter = progress_mode.reporter();
    let pipeline = BatchPipeline::new(annotator.as_ref(), &pacer, reporter.as_ref(), settings.clone());

    let outcome = enrich_dataset(&store, &pipeline, limit).await?;
    print_outcome(&store, &outcome, &settings);
    Ok(())
}

fn print_outcome(store: &FileStore, outcome: &EnrichOutcome, settings: &PipelineSettings) {
    match outcome {
        EnrichOutcome::Skipped { state } => {
            println!(
                "{} is already {}; nothing to do.",
                store.path().display(),
                state
            );
            if *state == DatasetState::Analyzed {
                println!("Run `qenrich emotions` to derive emotions.");
            }
        }
        EnrichOutcome::Planned { quotes, plan } => {
            println!("Dry run for {}", store.path().display());
            println!("  quotes:      {}", quotes);
            println!("  batch size:  {}", settings.batch_size);
            println!("  groups:      {}", plan.groups);
            println!(
                "  pauses:      {} x {}ms",
                plan.pauses,
                settings.batch_delay.as_millis()
            );
        }
        EnrichOutcome::Preview(quotes) => {
            for q in quotes {
                println!(
                    "[{}] {} ({} / {})",
                    q.emotion.as_deref().unwrap_or("-"),
                    q.quote,
                    q.character,
                    q.anime
                );
                println!(
                    "    score={} label={} tags={}",
                    q.sentiment_score.unwrap_or_default(),
                    q.sentiment_label.as_deref().unwrap_or("-"),
                    q.tag_list().join(", ")
                );
            }
            println!("Preview only; {} was not modified.", store.path().display());
        }
        EnrichOutcome::Written(summary) => {
            println!("Backup written to {}", store.backup_path().display());
            println!("Enriched dataset written to {}", store.path().display());
            println!("Manifest written to {}", store.manifest_path().display());
            println!();
            print_summary(summary);
        }
    }
}
