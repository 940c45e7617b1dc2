//! Saved (bookmarked) quotes.
//!
//! Persisted as a JSON object whose namespace key holds an array of full
//! quote records:
//!
//! ```json
//! { "quote-search-saved-quotes": [ { "objectID": "42", "quote": "…", … } ] }
//! ```
//!
//! Other keys in the same file are preserved. Records are matched by
//! `objectID` only; a saved copy is not refreshed when the dataset changes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use quote_enrich_core::error::EnrichError;
use quote_enrich_core::models::Quote;
use quote_enrich_core::store::DatasetStore;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::dataset::{write_atomic, FileStore};

pub struct SavedQuotes {
    path: PathBuf,
    namespace: String,
    doc: Map<String, Value>,
    quotes: Vec<Quote>,
}

impl SavedQuotes {
    /// Read the saved-quote file. A missing file is an empty collection.
    pub fn load(path: &Path, namespace: &str) -> quote_enrich_core::error::Result<Self> {
        let doc: Map<String, Value> = match std::fs::read(path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| EnrichError::Malformed {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(EnrichError::storage(path, e)),
        };
        let quotes = match doc.get(namespace) {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| EnrichError::Malformed {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Vec::new(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            namespace: namespace.to_string(),
            doc,
            quotes,
        })
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn contains(&self, object_id: &str) -> bool {
        self.quotes
            .iter()
            .any(|q| q.object_id.as_deref() == Some(object_id))
    }

    /// Append `quote` unless a record with the same `objectID` is saved.
    /// Returns whether it was added.
    pub fn add(&mut self, quote: Quote) -> bool {
        match quote.object_id.as_deref() {
            Some(id) if !self.contains(id) => {
                self.quotes.push(quote);
                true
            }
            _ => false,
        }
    }

    /// Returns whether a record was removed.
    pub fn remove(&mut self, object_id: &str) -> bool {
        let before = self.quotes.len();
        self.quotes
            .retain(|q| q.object_id.as_deref() != Some(object_id));
        self.quotes.len() != before
    }

    /// Remove `quote` if saved, otherwise add it. Returns whether it is
    /// saved afterwards.
    pub fn toggle(&mut self, quote: Quote) -> bool {
        match quote.object_id.as_deref() {
            Some(id) if self.contains(id) => {
                let id = id.to_string();
                self.remove(&id);
                false
            }
            _ => self.add(quote),
        }
    }

    /// Returns how many records were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.quotes.len();
        self.quotes.clear();
        n
    }

    /// Rewrite the whole file.
    pub fn save(&mut self) -> quote_enrich_core::error::Result<()> {
        let value = serde_json::to_value(&self.quotes).map_err(|e| {
            EnrichError::storage(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.doc.insert(self.namespace.clone(), value);
        let bytes = serde_json::to_vec_pretty(&self.doc).map_err(|e| {
            EnrichError::storage(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        write_atomic(&self.path, &bytes)
    }
}

/// Operations of `qenrich saved`.
#[derive(Debug, Clone)]
pub enum SavedAction {
    List { json: bool },
    Add(String),
    Remove(String),
    Toggle(String),
    Clear,
}

async fn find_in_dataset(config: &Config, object_id: &str) -> Result<Quote> {
    let store = FileStore::new(&config.dataset);
    let quotes = store.load().await?;
    quotes
        .into_iter()
        .find(|q| q.object_id.as_deref() == Some(object_id))
        .ok_or_else(|| {
            EnrichError::NotFound(format!(
                "no quote with objectID '{}' in {}",
                object_id,
                store.path().display()
            ))
            .into()
        })
}

pub async fn run_saved(config: &Config, action: SavedAction) -> Result<()> {
    let mut saved = SavedQuotes::load(&config.saved.path, &config.saved.namespace)?;

    match action {
        SavedAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(saved.quotes())?);
            } else if saved.quotes().is_empty() {
                println!("No saved quotes.");
            } else {
                for q in saved.quotes() {
                    println!(
                        "{}  \"{}\" — {} ({})",
                        q.object_id.as_deref().unwrap_or("-"),
                        q.quote,
                        q.character,
                        q.anime
                    );
                }
            }
            return Ok(());
        }
        SavedAction::Add(id) => {
            let quote = find_in_dataset(config, &id).await?;
            if saved.add(quote) {
                println!("Saved {}", id);
            } else {
                println!("{} is already saved", id);
            }
        }
        SavedAction::Remove(id) => {
            if saved.remove(&id) {
                println!("Removed {}", id);
            } else {
                println!("{} was not saved", id);
            }
        }
        SavedAction::Toggle(id) => {
            let now_saved = if saved.contains(&id) {
                saved.remove(&id);
                false
            } else {
                saved.add(find_in_dataset(config, &id).await?)
            };
            println!("{} {}", if now_saved { "Saved" } else { "Removed" }, id);
        }
        SavedAction::Clear => {
            let n = saved.clear();
            println!("Removed {} saved quotes", n);
        }
    }

    saved.save()?;
    Ok(())
}
