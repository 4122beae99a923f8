use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Confidence;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/prose.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_sentences")]
    pub min_sentences: usize,
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_sentences: default_min_sentences(),
            max_sentences: default_max_sentences(),
            min_tokens: default_min_tokens(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_min_sentences() -> usize {
    2
}
fn default_max_sentences() -> usize {
    8
}
fn default_min_tokens() -> usize {
    128
}
fn default_max_tokens() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_hybrid_alpha")]
    pub hybrid_alpha: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    #[serde(default = "default_retrieval_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Most frequent document terms appended to the context-retrieval query.
    #[serde(default = "default_context_terms")]
    pub context_terms: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid_alpha: default_hybrid_alpha(),
            top_k: default_top_k(),
            candidate_k: default_candidate_k(),
            timeout_ms: default_retrieval_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            context_terms: default_context_terms(),
        }
    }
}

impl RetrievalConfig {
    /// Results retained per query, kept within 3..=6.
    pub fn effective_top_k(&self) -> usize {
        self.top_k.clamp(3, 6)
    }
}

fn default_hybrid_alpha() -> f64 {
    0.6
}
fn default_top_k() -> usize {
    4
}
fn default_candidate_k() -> usize {
    40
}
fn default_retrieval_timeout_ms() -> u64 {
    2000
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_capacity() -> u64 {
    256
}
fn default_context_terms() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra words a rewrite may have over the original (K).
    #[serde(default = "default_word_budget")]
    pub word_budget: usize,
    /// Retrieved chunks embedded in a prompt.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            timeout_secs: default_generation_timeout_secs(),
            word_budget: default_word_budget(),
            max_chunks: default_max_chunks(),
            temperature: default_temperature(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_generation_provider() -> String {
    "disabled".to_string()
}
fn default_generation_model() -> String {
    "llama3.2".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    12
}
fn default_word_budget() -> usize {
    6
}
fn default_max_chunks() -> usize {
    4
}
fn default_temperature() -> f32 {
    0.2
}

/// Minimum confidence each generative stage needs for its result to stop
/// the cascade. The deterministic fallback has no threshold.
#[derive(Debug, Deserialize, Clone)]
pub struct CascadeConfig {
    #[serde(default = "default_high")]
    pub document_search: Confidence,
    #[serde(default = "default_medium")]
    pub context_retrieval: Confidence,
    #[serde(default = "default_medium")]
    pub generative_rewrite: Confidence,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            document_search: Confidence::High,
            context_retrieval: Confidence::Medium,
            generative_rewrite: Confidence::Medium,
        }
    }
}

fn default_high() -> Confidence {
    Confidence::High
}
fn default_medium() -> Confidence {
    Confidence::Medium
}

/// Subject substitution for passive→active rewrites without a "by" agent.
#[derive(Debug, Deserialize, Clone)]
pub struct TransformConfig {
    #[serde(default = "default_subject")]
    pub default_subject: String,
    #[serde(default = "default_second_person_subject")]
    pub second_person_subject: String,
    /// Words in a neighbouring sentence that mark instructional context.
    #[serde(default = "default_instructional_markers")]
    pub instructional_markers: Vec<String>,
    #[serde(default)]
    pub prefer_second_person: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_subject: default_subject(),
            second_person_subject: default_second_person_subject(),
            instructional_markers: default_instructional_markers(),
            prefer_second_person: false,
        }
    }
}

fn default_subject() -> String {
    "the system".to_string()
}
fn default_second_person_subject() -> String {
    "you".to_string()
}
fn default_instructional_markers() -> Vec<String> {
    ["requirement", "requirements", "prerequisite", "prerequisites", "must", "step", "following"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::default`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let chunking = &config.chunking;
    if chunking.min_sentences == 0 || chunking.max_sentences < chunking.min_sentences {
        anyhow::bail!("chunking.max_sentences must be >= chunking.min_sentences >= 1");
    }
    if chunking.max_tokens == 0 || chunking.max_tokens < chunking.min_tokens {
        anyhow::bail!("chunking.max_tokens must be >= chunking.min_tokens and > 0");
    }

    if !(0.0..=1.0).contains(&config.retrieval.hybrid_alpha) {
        anyhow::bail!("retrieval.hybrid_alpha must be in [0.0, 1.0]");
    }
    if config.retrieval.candidate_k == 0 {
        anyhow::bail!("retrieval.candidate_k must be >= 1");
    }
    if config.retrieval.timeout_ms == 0 {
        anyhow::bail!("retrieval.timeout_ms must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "hash" | "ollama" | "openai" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, ollama, openai, or local.",
            other
        ),
    }
    if matches!(config.embedding.provider.as_str(), "ollama" | "openai") {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.generation.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }
    if !(1..=60).contains(&config.generation.timeout_secs) {
        anyhow::bail!("generation.timeout_secs must be in [1, 60]");
    }
    if !(5..=8).contains(&config.generation.word_budget) {
        anyhow::bail!("generation.word_budget must be in [5, 8]");
    }
    if !(3..=5).contains(&config.generation.max_chunks) {
        anyhow::bail!("generation.max_chunks must be in [3, 5]");
    }

    if config.transform.default_subject.trim().is_empty()
        || config.transform.second_person_subject.trim().is_empty()
    {
        anyhow::bail!("transform subjects must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.retrieval.hybrid_alpha, 0.6);
        assert_eq!(config.generation.word_budget, 6);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.cascade.document_search, Confidence::High);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../config/prose.example.toml")).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.db.path, Config::default().db.path);
        assert_eq!(config.retrieval.top_k, RetrievalConfig::default().top_k);
        assert_eq!(config.retrieval.context_terms, RetrievalConfig::default().context_terms);
        assert_eq!(config.transform.instructional_markers, TransformConfig::default().instructional_markers);
        assert_eq!(config.ingest.include_globs, IngestConfig::default().include_globs);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [retrieval]
            hybrid_alpha = 0.3

            [cascade]
            document_search = "medium"
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.hybrid_alpha, 0.3);
        assert_eq!(config.retrieval.timeout_ms, 2000);
        assert_eq!(config.cascade.document_search, Confidence::Medium);
    }

    #[test]
    fn test_rejects_bad_alpha() {
        let mut config = Config::default();
        config.retrieval.hybrid_alpha = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_word_budget_outside_range() {
        let mut config = Config::default();
        config.generation.word_budget = 12;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("word_budget"), "unexpected error: {}", err);
    }

    #[test]
    fn test_rejects_unknown_generation_provider() {
        let mut config = Config::default();
        config.generation.provider = "gpt-cloud".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_top_k_clamped() {
        let mut retrieval = RetrievalConfig::default();
        retrieval.top_k = 50;
        assert_eq!(retrieval.effective_top_k(), 6);
        retrieval.top_k = 1;
        assert_eq!(retrieval.effective_top_k(), 3);
    }
}
