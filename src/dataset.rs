//! File-backed [`DatasetStore`].
//!
//! Every write goes to a temporary file in the target's directory, is
//! fsynced, and is then renamed over the target, so a crash never leaves a
//! truncated dataset, backup, or manifest behind.
//!
//! Mutating runs hold a [`RunLock`] (`<dataset>.lock`, created exclusively)
//! so two runs cannot rewrite the same file concurrently.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quote_enrich_core::error::{EnrichError, Result};
use quote_enrich_core::models::{DatasetManifest, DatasetState, Quote};
use quote_enrich_core::store::{parse_quotes, render_quotes, DatasetStore};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::config::DatasetConfig;

pub struct FileStore {
    path: PathBuf,
    backup_path: PathBuf,
    manifest_path: PathBuf,
}

impl FileStore {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            path: config.path.clone(),
            backup_path: config.backup_path(),
            manifest_path: config.manifest_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

#[async_trait]
impl DatasetStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_raw(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| EnrichError::storage(&self.path, e))
    }

    async fn backup(&self, raw: &[u8]) -> Result<()> {
        write_atomic(&self.backup_path, raw)?;
        tracing::info!(path = %self.backup_path.display(), bytes = raw.len(), "backup written");
        Ok(())
    }

    async fn save(&self, quotes: &[Quote]) -> Result<()> {
        let bytes = render_quotes(quotes).map_err(|e| {
            EnrichError::storage(&self.path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        write_atomic(&self.path, &bytes)?;
        tracing::info!(path = %self.path.display(), records = quotes.len(), "dataset written");
        Ok(())
    }

    async fn load_manifest(&self) -> Result<Option<DatasetManifest>> {
        let raw = match std::fs::read(&self.manifest_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EnrichError::storage(&self.manifest_path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| EnrichError::Malformed {
                path: self.manifest_path.clone(),
                source,
            })
    }

    async fn save_manifest(&self, manifest: &DatasetManifest) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| {
            EnrichError::storage(
                &self.manifest_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        write_atomic(&self.manifest_path, &bytes)
    }
}

/// A dataset read from a store together with its resolved state.
#[derive(Debug)]
pub struct LoadedDataset {
    /// Canonical bytes as found on disk; these go to the backup unchanged.
    pub raw: Vec<u8>,
    pub quotes: Vec<Quote>,
    pub state: DatasetState,
}

/// Read the dataset and its manifest and resolve the state.
///
/// The manifest is only trusted when its `dataset_sha256` matches the bytes
/// just read. Otherwise (for instance after the backup was copied back over
/// the dataset) the state is sampled from the first record.
pub async fn load_dataset(store: &dyn DatasetStore) -> Result<LoadedDataset> {
    let raw = store.load_raw().await?;
    let quotes = parse_quotes(&raw).map_err(|source| EnrichError::Malformed {
        path: store.location().into(),
        source,
    })?;
    let manifest = store.load_manifest().await?;
    let digest = sha256_hex(&raw);
    if let Some(m) = manifest.as_ref().filter(|m| !m.describes(&digest)) {
        tracing::warn!(
            location = %store.location(),
            manifest_state = %m.state,
            "manifest does not match the dataset on disk; inspecting records instead"
        );
    }
    let state = DatasetState::detect(&quotes, manifest.as_ref(), &digest);
    Ok(LoadedDataset { raw, quotes, state })
}

/// Hex SHA-256 of `quotes` as [`DatasetStore::save`] renders them.
pub fn rendered_sha256(quotes: &[Quote]) -> std::result::Result<String, serde_json::Error> {
    render_quotes(quotes).map(|bytes| sha256_hex(&bytes))
}

/// Write `bytes` to `path` via temp file + fsync + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| EnrichError::storage(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| EnrichError::storage(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| EnrichError::storage(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| EnrichError::storage(path, e.error))?;
    Ok(())
}

/// Hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Exclusive lock held for the duration of a mutating run.
///
/// Released (file removed) on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(EnrichError::Locked {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(EnrichError::storage(path, e)),
        };
        // Best effort: the pid only helps an operator clean up a stale lock.
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
