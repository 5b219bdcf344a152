use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Lower bound on `retrieval.k`.
pub const MIN_K: usize = 1;
/// Upper bound on `retrieval.k`.
pub const MAX_K: usize = 20;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub guardrail: GuardrailConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Path to the crawler's JSON output (an array of document records).
    pub path: PathBuf,
    /// Human-readable name of the corpus, used in the prompt template.
    #[serde(default = "default_corpus_name")]
    pub name: String,
}

fn default_corpus_name() -> String {
    "the documentation".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size_tokens: usize,
    #[serde(default = "default_overlap")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: default_chunk_size(),
            overlap_tokens: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    300
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per query. Clamped to [`MIN_K`]..=[`MAX_K`].
    #[serde(default = "default_k")]
    pub k: usize,
    /// Token budget for the assembled context block.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_k() -> usize {
    5
}
fn default_max_context_tokens() -> usize {
    1500
}

/// Distance thresholds for confidence bucketing. Tunable; only the ordering
/// `t_high < t_medium` is enforced.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    #[serde(default = "default_t_high")]
    pub t_high: f32,
    #[serde(default = "default_t_medium")]
    pub t_medium: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            t_high: default_t_high(),
            t_medium: default_t_medium(),
        }
    }
}

fn default_t_high() -> f32 {
    0.3
}
fn default_t_medium() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardrailConfig {
    /// Deny-list of patterns matched case-insensitively against queries.
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            denylist: default_denylist(),
        }
    }
}

fn default_denylist() -> Vec<String> {
    [
        "hack",
        "exploit",
        "bypass",
        "unauthorized access",
        "personal information",
        "private data",
        "confidential",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// Number of conversation turns retained in the rolling window.
    #[serde(default = "default_memory_window")]
    pub window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window: default_memory_window(),
        }
    }
}

fn default_memory_window() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local` (hashed term-frequency, offline), `openai`, or `disabled`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `openai` (any OpenAI-compatible chat endpoint) or `disabled`.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            base_url: None,
            max_retries: default_llm_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "disabled".to_string()
}
fn default_llm_max_retries() -> u32 {
    2
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

/// Startup validation. Violations here are configuration errors: fatal,
/// never retried at runtime.
pub fn validate(config: &Config) -> Result<()> {
    // Chunking: both positive, overlap strictly smaller than the chunk size
    if config.chunking.chunk_size_tokens == 0 {
        anyhow::bail!("chunking.chunk_size_tokens must be > 0");
    }
    if config.chunking.overlap_tokens == 0 {
        anyhow::bail!("chunking.overlap_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.chunk_size_tokens {
        anyhow::bail!(
            "chunking.overlap_tokens ({}) must be < chunking.chunk_size_tokens ({})",
            config.chunking.overlap_tokens,
            config.chunking.chunk_size_tokens
        );
    }

    // Retrieval
    if !(MIN_K..=MAX_K).contains(&config.retrieval.k) {
        anyhow::bail!("retrieval.k must be in [{}, {}]", MIN_K, MAX_K);
    }
    if config.retrieval.max_context_tokens == 0 {
        anyhow::bail!("retrieval.max_context_tokens must be > 0");
    }

    // Confidence thresholds must be monotonically ordered
    if !(config.confidence.t_high.is_finite() && config.confidence.t_medium.is_finite()) {
        anyhow::bail!("confidence thresholds must be finite");
    }
    if config.confidence.t_high >= config.confidence.t_medium {
        anyhow::bail!(
            "confidence.t_high ({}) must be < confidence.t_medium ({})",
            config.confidence.t_high,
            config.confidence.t_medium
        );
    }

    if config.memory.window == 0 {
        anyhow::bail!("memory.window must be > 0");
    }

    // Embedding
    match config.embedding.provider.as_str() {
        "local" | "disabled" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'openai'");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, or disabled.",
            other
        ),
    }

    // Language model
    match config.llm.provider.as_str() {
        "disabled" => {}
        "openai" => {
            if config.llm.model.is_none() {
                anyhow::bail!("llm.model must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be openai or disabled.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            corpus: CorpusConfig {
                path: PathBuf::from("data/corpus.json"),
                name: default_corpus_name(),
            },
            db: DbConfig {
                path: PathBuf::from("data/ask.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            confidence: ConfidenceConfig::default(),
            guardrail: GuardrailConfig::default(),
            memory: MemoryConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = base_config();
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking.chunk_size_tokens, 300);
        assert_eq!(config.chunking.overlap_tokens, 50);
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.memory.window, 6);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = base_config();
        config.chunking.overlap_tokens = 300;
        assert!(validate(&config).is_err());

        config.chunking.overlap_tokens = 301;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut config = base_config();
        config.chunking.chunk_size_tokens = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_threshold_ordering_enforced() {
        let mut config = base_config();
        config.confidence.t_high = 0.5;
        config.confidence.t_medium = 0.3;
        assert!(validate(&config).is_err());

        config.confidence.t_high = 0.4;
        config.confidence.t_medium = 0.4;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_k_bounds_enforced() {
        let mut config = base_config();
        config.retrieval.k = 0;
        assert!(validate(&config).is_err());

        config.retrieval.k = 21;
        assert!(validate(&config).is_err());

        config.retrieval.k = 20;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_openai_embedding_requires_model_and_dims() {
        let mut config = base_config();
        config.embedding.provider = "openai".to_string();
        assert!(validate(&config).is_err());

        config.embedding.model = Some("text-embedding-3-small".to_string());
        config.embedding.dims = Some(1536);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_providers_rejected() {
        let mut config = base_config();
        config.embedding.provider = "cohere".to_string();
        assert!(validate(&config).is_err());

        let mut config = base_config();
        config.llm.provider = "gemini".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[corpus]
path = "data/corpus.json"

[db]
path = "data/ask.sqlite"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.llm.provider, "disabled");
        assert_eq!(config.guardrail.denylist.len(), 7);
    }
}
