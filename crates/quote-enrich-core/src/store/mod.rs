//! Storage abstraction for the quote dataset.
//!
//! The [`DatasetStore`] trait covers everything the enrichment pipelines
//! need: raw reads (so the backup is byte-identical to the original file),
//! backup, save, and the manifest sidecar. The file-backed implementation
//! lives in the app crate; [`memory::InMemoryStore`] serves tests.
//!
//! # Ordering contract
//!
//! Callers must write [`backup`](DatasetStore::backup) before
//! [`save`](DatasetStore::save), and implementations must not return from
//! `backup` until the bytes are durable.

pub mod memory;

use async_trait::async_trait;

use crate::error::{EnrichError, Result};
use crate::models::{DatasetManifest, Quote};

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Human-readable location of the canonical dataset (path or label).
    fn location(&self) -> String;

    /// Read the canonical dataset exactly as stored.
    async fn load_raw(&self) -> Result<Vec<u8>>;

    /// Persist the pre-mutation bytes as the backup snapshot.
    async fn backup(&self, raw: &[u8]) -> Result<()>;

    /// Overwrite the canonical dataset.
    async fn save(&self, quotes: &[Quote]) -> Result<()>;

    async fn load_manifest(&self) -> Result<Option<DatasetManifest>>;

    async fn save_manifest(&self, manifest: &DatasetManifest) -> Result<()>;

    /// Read and parse the canonical dataset.
    async fn load(&self) -> Result<Vec<Quote>> {
        let raw = self.load_raw().await?;
        parse_quotes(&raw).map_err(|source| EnrichError::Malformed {
            path: self.location().into(),
            source,
        })
    }
}

/// Parse a JSON array of quotes.
pub fn parse_quotes(raw: &[u8]) -> std::result::Result<Vec<Quote>, serde_json::Error> {
    serde_json::from_slice(raw)
}

/// Serialize quotes with two-space indentation.
pub fn render_quotes(quotes: &[Quote]) -> std::result::Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(quotes)
}
