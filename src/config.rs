use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub saved: SavedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Defaults to `<stem>.backup.json` next to `path`.
    #[serde(default)]
    pub backup_path: Option<PathBuf>,
    /// Defaults to `<stem>.meta.json` next to `path`.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
}

impl DatasetConfig {
    pub fn backup_path(&self) -> PathBuf {
        self.backup_path
            .clone()
            .unwrap_or_else(|| sibling(&self.path, "backup.json"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| sibling(&self.path, "meta.json"))
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

/// `data/quotes.json` + `backup.json` → `data/quotes.backup.json`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "quotes".to_string());
    path.with_file_name(format!("{}.{}", stem, suffix))
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnnotatorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    200
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Token-bucket limit on completion calls; unset means unlimited.
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    #[serde(default)]
    pub burst: Option<u32>,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            requests_per_minute: None,
            burst: None,
            progress_every: default_progress_every(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_batch_delay_ms() -> u64 {
    2000
}
fn default_progress_every() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SavedConfig {
    #[serde(default = "default_saved_path")]
    pub path: PathBuf,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for SavedConfig {
    fn default() -> Self {
        Self {
            path: default_saved_path(),
            namespace: default_namespace(),
        }
    }
}

fn default_saved_path() -> PathBuf {
    PathBuf::from("./data/saved.json")
}
fn default_namespace() -> String {
    "quote-search-saved-quotes".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate pipeline
    if config.pipeline.batch_size == 0 {
        anyhow::bail!("pipeline.batch_size must be > 0");
    }
    if config.pipeline.progress_every == 0 {
        anyhow::bail!("pipeline.progress_every must be > 0");
    }
    if config.pipeline.requests_per_minute == Some(0) {
        anyhow::bail!("pipeline.requests_per_minute must be > 0 when set");
    }
    if config.pipeline.burst == Some(0) {
        anyhow::bail!("pipeline.burst must be > 0 when set");
    }

    // Validate annotator
    if !(0.0..=2.0).contains(&config.annotator.temperature) {
        anyhow::bail!("annotator.temperature must be in [0.0, 2.0]");
    }
    if config.annotator.max_tokens == 0 {
        anyhow::bail!("annotator.max_tokens must be > 0");
    }
    if config.annotator.timeout_secs == 0 {
        anyhow::bail!("annotator.timeout_secs must be > 0");
    }

    match config.annotator.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown annotator provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.saved.namespace.is_empty() {
        anyhow::bail!("saved.namespace must not be empty");
    }

    Ok(config)
}
