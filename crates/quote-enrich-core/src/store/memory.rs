//! In-memory [`DatasetStore`] for tests and dry runs.
//!
//! Uses `std::sync::RwLock` for interior mutability and records the order of
//! mutating calls in [`InMemoryStore::ops`] so tests can check that the
//! backup was written before the canonical data.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{EnrichError, Result};
use crate::models::{DatasetManifest, Quote};

use super::{render_quotes, DatasetStore};

/// A mutating call observed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Backup,
    Save,
    SaveManifest,
}

pub struct InMemoryStore {
    raw: RwLock<Vec<u8>>,
    backup: RwLock<Option<Vec<u8>>>,
    manifest: RwLock<Option<DatasetManifest>>,
    ops: RwLock<Vec<StoreOp>>,
}

impl InMemoryStore {
    /// Start from raw dataset bytes.
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            raw: RwLock::new(raw.into()),
            backup: RwLock::new(None),
            manifest: RwLock::new(None),
            ops: RwLock::new(Vec::new()),
        }
    }

    /// Start from quotes rendered the way the file store writes them.
    pub fn from_quotes(quotes: &[Quote]) -> Self {
        Self::new(render_quotes(quotes).unwrap_or_default())
    }

    pub fn with_manifest(self, manifest: DatasetManifest) -> Self {
        *self.manifest.write().unwrap() = Some(manifest);
        self
    }

    pub fn raw(&self) -> Vec<u8> {
        self.raw.read().unwrap().clone()
    }

    pub fn backup_bytes(&self) -> Option<Vec<u8>> {
        self.backup.read().unwrap().clone()
    }

    pub fn manifest(&self) -> Option<DatasetManifest> {
        self.manifest.read().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.read().unwrap().clone()
    }
}

#[async_trait]
impl DatasetStore for InMemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn load_raw(&self) -> Result<Vec<u8>> {
        Ok(self.raw())
    }

    async fn backup(&self, raw: &[u8]) -> Result<()> {
        *self.backup.write().unwrap() = Some(raw.to_vec());
        self.ops.write().unwrap().push(StoreOp::Backup);
        Ok(())
    }

    async fn save(&self, quotes: &[Quote]) -> Result<()> {
        let rendered = render_quotes(quotes).map_err(|e| {
            EnrichError::storage("memory", std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        *self.raw.write().unwrap() = rendered;
        self.ops.write().unwrap().push(StoreOp::Save);
        Ok(())
    }

    async fn load_manifest(&self) -> Result<Option<DatasetManifest>> {
        Ok(self.manifest())
    }

    async fn save_manifest(&self, manifest: &DatasetManifest) -> Result<()> {
        *self.manifest.write().unwrap() = Some(manifest.clone());
        self.ops.write().unwrap().push(StoreOp::SaveManifest);
        Ok(())
    }
}
