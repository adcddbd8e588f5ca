use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Name of the index on the backing service.
    pub name: String,
    /// Control-plane base URL of the vector index service.
    pub url: String,
    pub dimension: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Namespace isolating this dataset from other data in the index.
    pub namespace: String,
    #[serde(default = "default_ready_poll_secs")]
    pub ready_poll_secs: u64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_metric() -> String {
    "cosine".to_string()
}
fn default_ready_poll_secs() -> u64 {
    1
}
fn default_ready_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub url: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Percentile of consecutive-sentence distances above which a
    /// semantic boundary is cut.
    #[serde(default = "default_breakpoint_percentile")]
    pub breakpoint_percentile: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            breakpoint_percentile: default_breakpoint_percentile(),
        }
    }
}

fn default_breakpoint_percentile() -> f64 {
    95.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.store.page_size < 1 {
        anyhow::bail!("store.page_size must be >= 1");
    }

    if config.index.dimension == 0 {
        anyhow::bail!("index.dimension must be > 0");
    }
    if config.embedding.dimension != config.index.dimension {
        anyhow::bail!(
            "embedding.dimension ({}) must match index.dimension ({})",
            config.embedding.dimension,
            config.index.dimension
        );
    }
    match config.index.metric.as_str() {
        "cosine" | "dotproduct" | "euclidean" => {}
        other => anyhow::bail!(
            "Unknown index metric: '{}'. Must be cosine, dotproduct, or euclidean.",
            other
        ),
    }
    if config.index.namespace.trim().is_empty() {
        anyhow::bail!("index.namespace must not be empty");
    }

    if !(0.0..=100.0).contains(&config.chunking.breakpoint_percentile)
        || config.chunking.breakpoint_percentile == 0.0
    {
        anyhow::bail!("chunking.breakpoint_percentile must be in (0.0, 100.0]");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    Ok(config)
}
