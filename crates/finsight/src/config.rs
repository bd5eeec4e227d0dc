//! TOML configuration.
//!
//! Every section except `[server]` is optional and falls back to defaults.
//! [`load_config`] parses and validates; [`Config::pipeline_settings`]
//! projects the tuning knobs into the core crate's settings type.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use finsight_core::chart::ChartSettings;
use finsight_core::filter::FilterSettings;
use finsight_core::pipeline::PipelineSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.2
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_provider")]
    pub provider: String,
    #[serde(default = "default_index")]
    pub index: String,
    /// Pinecone index host, e.g. `https://transactions-xxxx.svc.pinecone.io`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_store_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            index: default_index(),
            host: None,
            namespace: String::new(),
            top_k: default_top_k(),
            max_retries: default_store_max_retries(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

fn default_store_provider() -> String {
    "memory".to_string()
}
fn default_index() -> String {
    "transactions".to_string()
}
fn default_top_k() -> usize {
    20
}
fn default_store_max_retries() -> u32 {
    2
}
fn default_store_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: f64,
    #[serde(default = "default_min_filtered")]
    pub min_filtered: usize,
    #[serde(default = "default_leniency_pool")]
    pub leniency_pool: usize,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default)]
    pub synthetic_padding: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            amount_tolerance: default_amount_tolerance(),
            min_filtered: default_min_filtered(),
            leniency_pool: default_leniency_pool(),
            sample_size: default_sample_size(),
            max_points: default_max_points(),
            synthetic_padding: false,
        }
    }
}

fn default_min_score() -> f64 {
    0.7
}
fn default_amount_tolerance() -> f64 {
    5.0
}
fn default_min_filtered() -> usize {
    3
}
fn default_leniency_pool() -> usize {
    6
}
fn default_sample_size() -> usize {
    5
}
fn default_max_points() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    /// JSON seed file. Seeding is skipped when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Transactions per stored document.
    #[serde(default = "default_seed_batch")]
    pub batch_size: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            path: None,
            batch_size: default_seed_batch(),
        }
    }
}

fn default_seed_batch() -> usize {
    10
}

impl Config {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            index: self.store.index.clone(),
            top_k: self.store.top_k,
            sample_size: self.pipeline.sample_size,
            filter: FilterSettings {
                min_score: self.pipeline.min_score,
                amount_tolerance: self.pipeline.amount_tolerance,
                min_filtered: self.pipeline.min_filtered,
                leniency_pool: self.pipeline.leniency_pool,
            },
            chart: ChartSettings {
                max_points: self.pipeline.max_points,
                synthetic_padding: self.pipeline.synthetic_padding,
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.store.top_k < 1 {
        bail!("store.top_k must be >= 1");
    }
    if config.store.timeout_secs == 0 {
        bail!("store.timeout_secs must be >= 1");
    }
    if config.pipeline.sample_size < 1 {
        bail!("pipeline.sample_size must be >= 1");
    }
    if config.pipeline.max_points < 1 {
        bail!("pipeline.max_points must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.pipeline.min_score) {
        bail!("pipeline.min_score must be in [0.0, 1.0]");
    }
    if config.pipeline.amount_tolerance < 0.0 {
        bail!("pipeline.amount_tolerance must be >= 0");
    }
    if config.seed.batch_size < 1 {
        bail!("seed.batch_size must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.store.provider.as_str() {
        "memory" => {}
        "pinecone" => {
            if config.store.host.as_deref().map_or(true, str::is_empty) {
                bail!("store.host must be set when provider is 'pinecone'");
            }
        }
        other => bail!(
            "Unknown store provider: '{}'. Must be memory or pinecone.",
            other
        ),
    }

    // The in-memory store starts empty; without seed data nothing is ever found.
    if config.store.provider == "memory" && config.seed.path.is_none() {
        tracing::warn!("store.provider is 'memory' but no [seed].path is configured");
    }

    Ok(())
}
