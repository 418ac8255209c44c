use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct VaultConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub similarity: SimilarityConfig,
    pub retrieval: RetrievalConfig,
    pub conflict: ConflictConfig,
    pub learning: LearningConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimilarityConfig {
    /// `lexical` (TF-IDF) or `dense` (local ONNX embeddings).
    pub backend: String,
    pub model: String,
    pub cache_dir: String,
}

/// Unit used to measure token budgets.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetUnit {
    Chars,
    /// Approximate tokens: one per four characters, rounded up.
    Tokens,
}

impl BudgetUnit {
    pub fn measure(&self, text: &str) -> usize {
        let chars = text.chars().count();
        match self {
            Self::Chars => chars,
            Self::Tokens => chars.div_ceil(4),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub weight_relevance: f64,
    pub weight_recency: f64,
    pub weight_confidence: f64,
    pub weight_frequency: f64,
    pub half_life_days: f64,
    pub diversity_penalty: f64,
    /// Access count at which the frequency factor saturates at 1.0.
    pub frequency_saturation: u32,
    pub token_budget: usize,
    pub budget_unit: BudgetUnit,
    pub candidate_pool: usize,
    pub max_entries: usize,
    pub min_similarity: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConflictConfig {
    pub enabled: bool,
    pub similarity_threshold: f64,
    pub neighbours: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub queue_capacity: usize,
    pub initial_confidence_ceiling: f64,
    pub promotion_threshold: f64,
    pub reinforcement_step: f64,
    pub dedup_threshold: f64,
    pub manual_confidence: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:11435".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".into(),
            timeout_secs: 120,
            connect_timeout_secs: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_vault_dir()
            .join("vault.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        let cache_dir = default_vault_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "lexical".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            weight_relevance: 0.60,
            weight_recency: 0.15,
            weight_confidence: 0.20,
            weight_frequency: 0.05,
            half_life_days: 30.0,
            diversity_penalty: 0.5,
            frequency_saturation: 100,
            token_budget: 2000,
            budget_unit: BudgetUnit::Chars,
            candidate_pool: 50,
            max_entries: 8,
            min_similarity: 0.0,
        }
    }
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: 0.3,
            neighbours: 20,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 64,
            initial_confidence_ceiling: 0.55,
            promotion_threshold: 0.6,
            reinforcement_step: 0.1,
            dedup_threshold: 0.9,
            manual_confidence: 1.0,
        }
    }
}

/// Returns `~/.contextvault/`
pub fn default_vault_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".contextvault")
}

/// Returns the default config file path: `~/.contextvault/config.toml`
pub fn default_config_path() -> PathBuf {
    default_vault_dir().join("config.toml")
}

impl VaultConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, apply env var overrides, then validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            VaultConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CONTEXTVAULT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("CONTEXTVAULT_BACKEND_URL") {
            self.backend.url = val;
        }
        if let Ok(val) = std::env::var("CONTEXTVAULT_LISTEN") {
            self.server.listen = val;
        }
        if let Ok(val) = std::env::var("CONTEXTVAULT_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Reject configurations the scorer and learner cannot honour.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        let weights = [
            ("weight_relevance", r.weight_relevance),
            ("weight_recency", r.weight_recency),
            ("weight_confidence", r.weight_confidence),
            ("weight_frequency", r.weight_frequency),
        ];
        for (name, w) in weights {
            if !(w >= 0.0) {
                bail!("retrieval.{name} must be >= 0, got {w}");
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-6 {
            bail!("retrieval weights must sum to 1.0, got {sum}");
        }
        if !(r.half_life_days > 0.0) {
            bail!("retrieval.half_life_days must be positive");
        }
        if !(r.diversity_penalty > 0.0 && r.diversity_penalty < 1.0) {
            bail!("retrieval.diversity_penalty must lie strictly between 0 and 1");
        }
        if r.frequency_saturation == 0 {
            bail!("retrieval.frequency_saturation must be at least 1");
        }

        let l = &self.learning;
        if l.initial_confidence_ceiling >= l.promotion_threshold {
            bail!(
                "learning.initial_confidence_ceiling ({}) must be below promotion_threshold ({})",
                l.initial_confidence_ceiling,
                l.promotion_threshold
            );
        }
        if !(0.0..=1.0).contains(&l.manual_confidence) {
            bail!("learning.manual_confidence must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.conflict.similarity_threshold) {
            bail!("conflict.similarity_threshold must be between 0.0 and 1.0");
        }
        match self.similarity.backend.as_str() {
            "lexical" | "dense" => Ok(()),
            other => bail!("unknown similarity backend: {other}. Supported: lexical, dense"),
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
