//! # Quote Enrich
//!
//! Offline enrichment of a quote dataset with sentiment scores, theme tags,
//! and derived emotions, using a text-completion API for the per-quote
//! analysis and a fixed keyword table for the emotion.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────┐
//! │  FileStore  │──▶│ BatchPipeline │──▶│  Annotator   │
//! │ quotes.json │   │ groups+pause  │   │ chat/complete│
//! └──────┬──────┘   └───────┬───────┘   └──────────────┘
//!        │                  ▼
//!        │           derive_emotion
//!        ▼
//!  backup → dataset → manifest
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qenrich enrich --dry-run        # plan only
//! qenrich probe                   # try the API on three sample quotes
//! qenrich enrich                  # annotate and write
//! qenrich stats
//! qenrich query --emotion Hopeful
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`annotator`] | OpenAI chat-completions annotator |
//! | [`dataset`] | File-backed dataset store, atomic writes, run lock |
//! | [`pipeline`] | Grouped, paced, concurrent annotation |
//! | [`enrich_cmd`] | `enrich` orchestration |
//! | [`emotions_cmd`] | Emotion-only pass |
//! | [`probe`] | Sample-quote probe |
//! | [`query`] / [`stats`] | Dataset exploration |
//! | [`saved`] | Saved-quote persistence |
//! | [`progress`] | Progress reporting on stderr |
//!
//! Types shared with other consumers of an enriched dataset live in
//! `quote-enrich-core` and are re-exported here.

pub mod annotator;
pub mod config;
pub mod dataset;
pub mod emotions_cmd;
pub mod enrich_cmd;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod query;
pub mod saved;
pub mod stats;

pub use quote_enrich_core::{annotate, emotion, error, explore, models, store};
