//! Pipeline and `enrich` orchestration driven through test doubles: a
//! scripted annotator, a pause-counting pacer, and the in-memory store.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quote_enrich::annotate::{AnnotateError, Analysis, AnnotationStatus, Annotator, QuoteText};
use quote_enrich::dataset::sha256_hex;
use quote_enrich::enrich_cmd::{enrich_dataset, plan_dataset, EnrichOutcome};
use quote_enrich::models::{DatasetManifest, DatasetState, Quote};
use quote_enrich::pipeline::{BatchPipeline, BatchPlan, Pacer, PipelineSettings};
use quote_enrich::progress::{NoProgress, ProgressEvent, ProgressReporter};
use quote_enrich::store::memory::{InMemoryStore, StoreOp};
use quote_enrich::store::DatasetStore;

enum Script {
    Reply(Analysis),
    Fail,
    Hang,
}

/// Answers by quote text; unknown quotes get a positive "hope" analysis.
struct ScriptedAnnotator {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedAnnotator {
    fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, quote: &str, script: Script) -> Self {
        self.scripts.insert(quote.to_string(), script);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn analysis(score: i64, label: &str, tags: &[&str]) -> Analysis {
    Analysis {
        sentiment_score: score,
        sentiment_label: label.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[async_trait]
impl Annotator for ScriptedAnnotator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn analyze(&self, quote: QuoteText<'_>) -> Result<Analysis, AnnotateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(quote.quote) {
            Some(Script::Reply(a)) => Ok(a.clone()),
            Some(Script::Fail) => Err(AnnotateError::Status {
                status: 500,
                body: "boom".into(),
            }),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(analysis(10, "positive", &["late"]))
            }
            None => Ok(analysis(7, "positive", &["hope"])),
        }
    }
}

#[derive(Default)]
struct CountingPacer {
    pauses: AtomicUsize,
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self, _duration: Duration) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn raw_quotes(n: usize) -> Vec<Quote> {
    (0..n)
        .map(|i| Quote::new(format!("quote {i}"), "Character", "Anime").with_object_id(i.to_string()))
        .collect()
}

fn settings(batch_size: usize) -> PipelineSettings {
    PipelineSettings {
        batch_size,
        batch_delay: Duration::from_millis(2000),
        call_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    }
}

#[tokio::test]
async fn twenty_five_quotes_run_in_three_groups_with_two_pauses() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let progress = RecordingProgress::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &progress, settings(10));

    let out = pipeline.process(raw_quotes(25)).await;

    assert_eq!(out.len(), 25);
    assert_eq!(annotator.calls(), 25);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 2);
    for (i, q) in out.iter().enumerate() {
        assert_eq!(q.object_id.as_deref(), Some(i.to_string().as_str()));
        assert_eq!(q.emotion.as_deref(), Some("Hopeful"));
    }

    let groups: Vec<(u64, u64)> = progress
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Group { group, n, .. } => Some((*group, *n)),
            _ => None,
        })
        .collect();
    assert_eq!(groups, vec![(1, 10), (2, 20), (3, 25)]);
    assert_eq!(BatchPlan::new(25, 10), BatchPlan { groups: 3, pauses: 2 });
}

#[tokio::test]
async fn failing_item_is_defaulted_and_siblings_keep_results() {
    let annotator = ScriptedAnnotator::new()
        .with("quote 1", Script::Fail)
        .with("quote 2", Script::Reply(analysis(2, "negative", &["betrayal"])));
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let out = pipeline.process(raw_quotes(3)).await;

    assert_eq!(out[1].sentiment_score, Some(5));
    assert_eq!(out[1].sentiment_label.as_deref(), Some("neutral"));
    assert_eq!(out[1].tags, Some(vec!["general".to_string()]));
    assert_eq!(out[1].emotion.as_deref(), Some("Neutral"));
    assert_eq!(out[1].annotation_status, Some(AnnotationStatus::Defaulted));

    assert_eq!(out[0].sentiment_score, Some(7));
    assert_eq!(out[0].annotation_status, Some(AnnotationStatus::Ok));
    assert_eq!(out[2].sentiment_label.as_deref(), Some("negative"));
    assert_eq!(out[2].emotion.as_deref(), Some("Tragic"));
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn timed_out_call_gets_the_default_analysis() {
    let annotator = ScriptedAnnotator::new().with("quote 0", Script::Hang);
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(
        &annotator,
        &pacer,
        &NoProgress,
        PipelineSettings {
            call_timeout: Duration::from_millis(50),
            ..settings(10)
        },
    );

    let out = pipeline.process(raw_quotes(2)).await;
    assert!(out[0].is_defaulted());
    assert_eq!(out[0].emotion.as_deref(), Some("Neutral"));
    assert!(!out[1].is_defaulted());
}

#[tokio::test]
async fn already_enriched_input_is_returned_untouched() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let first = pipeline.process(raw_quotes(15)).await;
    let calls_after_first = annotator.calls();
    let pauses_after_first = pacer.pauses.load(Ordering::SeqCst);

    let second = pipeline.process(first.clone()).await;
    assert_eq!(second, first);
    assert_eq!(annotator.calls(), calls_after_first);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), pauses_after_first);
}

#[tokio::test]
async fn annotated_progress_is_reported_every_n_records() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let progress = RecordingProgress::default();
    let pipeline = BatchPipeline::new(
        &annotator,
        &pacer,
        &progress,
        PipelineSettings {
            progress_every: 10,
            ..settings(4)
        },
    );

    pipeline.process(raw_quotes(25)).await;

    let marks: Vec<u64> = progress
        .events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Annotated { n, .. } => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(marks, vec![12, 20]);
}

#[tokio::test]
async fn enrich_writes_backup_then_dataset_then_manifest() {
    let seed = br#"[{"quote":"A","character":"X","anime":"Y"}]"#.to_vec();
    let store = InMemoryStore::new(seed.clone());
    let annotator = ScriptedAnnotator::new().with(
        "A",
        Script::Reply(analysis(9, "positive", &["courage", "love"])),
    );
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let outcome = enrich_dataset(&store, &pipeline, None).await.unwrap();

    let summary = match outcome {
        EnrichOutcome::Written(summary) => summary,
        other => panic!("expected a written dataset, got {:?}", other),
    };
    assert_eq!(summary.total, 1);
    assert_eq!(
        store.ops(),
        vec![StoreOp::Backup, StoreOp::Save, StoreOp::SaveManifest]
    );
    assert_eq!(store.backup_bytes(), Some(seed.clone()));

    let saved = store.load().await.unwrap();
    assert_eq!(saved[0].sentiment_score, Some(9));
    assert_eq!(saved[0].emotion.as_deref(), Some("Inspiring"));

    let manifest = store.manifest().unwrap();
    assert_eq!(manifest.state, DatasetState::Enriched);
    assert_eq!(manifest.record_count, 1);
    assert_eq!(manifest.source_sha256, sha256_hex(&seed));
    assert_eq!(manifest.dataset_sha256, sha256_hex(&store.raw()));
}

#[tokio::test]
async fn enrich_skips_when_manifest_matches_dataset() {
    let quotes = raw_quotes(3);
    let store = InMemoryStore::from_quotes(&quotes);
    let digest = sha256_hex(&store.raw());
    let store = store.with_manifest(DatasetManifest::new(
        DatasetState::Enriched,
        &quotes,
        "0".repeat(64),
        digest,
    ));
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let outcome = enrich_dataset(&store, &pipeline, None).await.unwrap();

    assert!(matches!(
        outcome,
        EnrichOutcome::Skipped {
            state: DatasetState::Enriched
        }
    ));
    assert_eq!(annotator.calls(), 0);
    assert!(store.ops().is_empty());
}

#[tokio::test]
async fn enrich_reprocesses_backup_restored_over_enriched_dataset() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let store = InMemoryStore::from_quotes(&raw_quotes(2));
    enrich_dataset(&store, &pipeline, None).await.unwrap();
    let stale = store.manifest().unwrap();
    let backup = store.backup_bytes().unwrap();

    // Operator copies the backup back over the dataset; the manifest stays.
    let restored = InMemoryStore::new(backup.clone()).with_manifest(stale);
    let outcome = enrich_dataset(&restored, &pipeline, None).await.unwrap();

    assert!(matches!(outcome, EnrichOutcome::Written(_)));
    assert_eq!(annotator.calls(), 4);
    assert_eq!(restored.backup_bytes(), Some(backup));
    let saved = restored.load().await.unwrap();
    assert!(saved[0].has_sentiment());
    assert_eq!(
        restored.manifest().unwrap().dataset_sha256,
        sha256_hex(&restored.raw())
    );
}

#[tokio::test]
async fn token_bucket_delays_calls_beyond_the_burst() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(
        &annotator,
        &pacer,
        &NoProgress,
        PipelineSettings {
            requests_per_minute: NonZeroU32::new(120),
            burst: NonZeroU32::new(2),
            ..settings(10)
        },
    );

    let started = Instant::now();
    let out = pipeline.process(raw_quotes(3)).await;
    let elapsed = started.elapsed();

    // Two calls fit the burst; the third waits for the next 500ms cell.
    assert!(elapsed >= Duration::from_millis(400), "elapsed {:?}", elapsed);
    assert_eq!(annotator.calls(), 3);
    assert!(out.iter().all(|q| !q.is_defaulted()));
}

#[tokio::test]
async fn burst_sized_run_is_not_delayed() {
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(
        &annotator,
        &pacer,
        &NoProgress,
        PipelineSettings {
            requests_per_minute: NonZeroU32::new(2),
            burst: NonZeroU32::new(3),
            ..settings(10)
        },
    );

    let started = Instant::now();
    pipeline.process(raw_quotes(3)).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(annotator.calls(), 3);
}

#[tokio::test]
async fn limited_run_previews_without_writing() {
    let store = InMemoryStore::from_quotes(&raw_quotes(30));
    let before = store.raw();
    let annotator = ScriptedAnnotator::new();
    let pacer = CountingPacer::default();
    let pipeline = BatchPipeline::new(&annotator, &pacer, &NoProgress, settings(10));

    let outcome = enrich_dataset(&store, &pipeline, Some(5)).await.unwrap();

    match outcome {
        EnrichOutcome::Preview(quotes) => assert_eq!(quotes.len(), 5),
        other => panic!("expected a preview, got {:?}", other),
    }
    assert_eq!(annotator.calls(), 5);
    assert!(store.ops().is_empty());
    assert_eq!(store.raw(), before);
}

#[tokio::test]
async fn dry_run_plan_matches_batch_math() {
    let store = InMemoryStore::from_quotes(&raw_quotes(25));
    match plan_dataset(&store, 10).await.unwrap() {
        EnrichOutcome::Planned { quotes, plan } => {
            assert_eq!(quotes, 25);
            assert_eq!(plan, BatchPlan { groups: 3, pauses: 2 });
        }
        other => panic!("expected a plan, got {:?}", other),
    }
    assert!(store.ops().is_empty());
}
