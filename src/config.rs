//! TOML configuration.
//!
//! Every section has defaults, so an absent config file yields a working
//! setup that only needs an OpenAI API key. The key is resolved from
//! `[secrets]` first and the `OPENAI_API_KEY` environment variable second.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::prompts;
use crate::store::DistanceMetric;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

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
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            collection: default_collection(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/claims.sqlite")
}
fn default_collection() -> String {
    "construction_documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_overlap")]
    pub overlap_tokens: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    /// Path to a HuggingFace `tokenizer.json`; only used with the
    /// `hf-tokenizer` feature.
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            tokenizer_path: None,
        }
    }
}

fn default_max_tokens() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}
fn default_min_chunk_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    1000
}
fn default_embedding_timeout() -> u64 {
    60
}
fn default_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            max_retries: 0,
            timeout_secs: default_llm_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Characters of the formatted document block sent for risk analysis.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Characters of each document included in the formatted block.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
    /// Transcript messages used to generate follow-up questions.
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    /// Trailing characters of the transcript sent for follow-up questions.
    #[serde(default = "default_history_chars")]
    pub history_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            max_document_chars: default_max_document_chars(),
            history_turns: default_history_turns(),
            history_chars: default_history_chars(),
        }
    }
}

fn default_max_prompt_chars() -> usize {
    15_000
}
fn default_max_document_chars() -> usize {
    2_000
}
fn default_history_turns() -> usize {
    3
}
fn default_history_chars() -> usize {
    1_000
}

/// Initial system and persona prompts for new sessions.
#[derive(Debug, Deserialize, Clone)]
pub struct PromptsConfig {
    #[serde(default = "default_system_prompt")]
    pub system: String,
    #[serde(default = "default_contractor_prompt")]
    pub contractor: String,
    #[serde(default = "default_owner_prompt")]
    pub owner: String,
    #[serde(default = "default_arbitrator_prompt")]
    pub arbitrator: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: default_system_prompt(),
            contractor: default_contractor_prompt(),
            owner: default_owner_prompt(),
            arbitrator: default_arbitrator_prompt(),
        }
    }
}

fn default_system_prompt() -> String {
    prompts::DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_contractor_prompt() -> String {
    prompts::DEFAULT_CONTRACTOR_PROMPT.to_string()
}
fn default_owner_prompt() -> String {
    prompts::DEFAULT_OWNER_PROMPT.to_string()
}
fn default_arbitrator_prompt() -> String {
    prompts::DEFAULT_ARBITRATOR_PROMPT.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    ["pdf", "docx", "doc", "xlsx", "xls", "txt"]
        .iter()
        .map(|ext| format!("**/*.{}", ext))
        .collect()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SecretsConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl Config {
    /// Resolve the OpenAI API key: `[secrets]` first, then the environment.
    pub fn openai_api_key(&self) -> Result<String> {
        let from_secrets = self
            .secrets
            .openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if let Some(key) = from_secrets {
            return Ok(key);
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => bail!(
                "OpenAI API key not found. Set [secrets] openai_api_key in the config \
                 or the OPENAI_API_KEY environment variable."
            ),
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

/// Load the config file if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.max_tokens {
        bail!("chunking.overlap_tokens must be smaller than chunking.max_tokens");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            bail!("embedding.dims must be > 0");
        }
        if config.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
    }

    // Validate model
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.analysis.max_prompt_chars == 0 || config.analysis.max_document_chars == 0 {
        bail!("analysis limits must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.chunking.max_tokens, 1000);
        assert_eq!(config.chunking.overlap_tokens, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.metric, DistanceMetric::Cosine);
        assert_eq!(config.llm.model, "gpt-4o");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.analysis.max_prompt_chars, 15_000);
        assert_eq!(config.db.collection, "construction_documents");
        assert_eq!(config.input.include_globs.len(), 6);
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let err = parse("[chunking]\nmax_tokens = 100\noverlap_tokens = 100\n").unwrap_err();
        assert!(err.to_string().contains("overlap_tokens"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = parse("[embedding]\nprovider = \"local\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn secrets_key_takes_precedence() {
        let config = parse("[secrets]\nopenai_api_key = \"sk-from-secrets\"\n").unwrap();
        assert_eq!(config.openai_api_key().unwrap(), "sk-from-secrets");
    }

    #[test]
    fn prompts_can_be_overridden() {
        let config = parse("[prompts]\nowner = \"Speak for the owner.\"\n").unwrap();
        assert_eq!(config.prompts.owner, "Speak for the owner.");
        assert_eq!(config.prompts.system, prompts::DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/nonexistent/cadv.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
    }
}
