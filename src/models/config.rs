use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION_PREFIX: &str = "docqa";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

pub const DEFAULT_CHUNK_SIZE: usize = 256;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;
pub const DEFAULT_UI_CHUNK_SIZE: usize = 512;
pub const MIN_UI_CHUNK_SIZE: usize = 100;
pub const MAX_UI_CHUNK_SIZE: usize = 2048;

pub const DEFAULT_K: u32 = 3;
pub const MIN_K: u32 = 1;
pub const MAX_K: u32 = 20;

/// USD per 1000 tokens for `text-embedding-ada-002`.
pub const DEFAULT_PRICE_PER_1K: f64 = 0.0004;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub cost: CostConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docqa").join("config.toml"))
    }

    /// Load the config file (if any), apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Overlay values from the process environment (and `.env`, once loaded).
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(bind) = non_empty("DOCQA_BIND") {
            self.server.bind = bind;
        }
        if let Some(driver) = non_empty("DOCQA_VECTOR_DRIVER")
            && let Ok(driver) = driver.parse()
        {
            self.vector_store.driver = driver;
        }
        if let Some(url) = non_empty("DOCQA_QDRANT_URL") {
            self.vector_store.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if !(MIN_UI_CHUNK_SIZE..=MAX_UI_CHUNK_SIZE).contains(&self.server.default_chunk_size) {
            return Err(ConfigError::ValidationError(format!(
                "server.default_chunk_size must be between {MIN_UI_CHUNK_SIZE} and {MAX_UI_CHUNK_SIZE}"
            )));
        }
        if !(MIN_K..=MAX_K).contains(&self.retrieval.k) {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.k must be between {MIN_K} and {MAX_K}"
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.cost.price_per_1k < 0.0 {
            return Err(ConfigError::ValidationError(
                "cost.price_per_1k cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_batch_size() -> u32 {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// How documents are cut into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed-size character windows.
    #[default]
    Window,
    /// Separator-aware splitting (paragraph, line, word, character).
    Recursive,
}

impl std::str::FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "window" => Ok(ChunkStrategy::Window),
            "recursive" => Ok(ChunkStrategy::Recursive),
            _ => Err(format!("unknown chunk strategy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub strategy: ChunkStrategy,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            strategy: ChunkStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: u32,
}

fn default_k() -> u32 {
    DEFAULT_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Model name the price applies to; shown next to the estimate.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_price_per_1k")]
    pub price_per_1k: f64,

    /// How tokens are counted when no `tokenizer_path` is set.
    #[serde(default)]
    pub encoding: TokenEncoding,

    /// HuggingFace `tokenizer.json`; takes precedence over `encoding`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,
}

/// Token counting scheme for cost estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEncoding {
    /// The BPE used by `text-embedding-ada-002`.
    #[default]
    Cl100kBase,
    /// Roughly four bytes per token.
    Heuristic,
}

fn default_price_per_1k() -> f64 {
    DEFAULT_PRICE_PER_1K
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            price_per_1k: default_price_per_1k(),
            encoding: TokenEncoding::default(),
            tokenizer_path: None,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// In-process index, dropped with the session.
    #[default]
    Memory,
    /// External Qdrant server, one collection per session.
    Qdrant,
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Memory => write!(f, "memory"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
        }
    }
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(VectorDriver::Memory),
            "qdrant" => Ok(VectorDriver::Qdrant),
            _ => Err(format!("unknown vector driver: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection_prefix() -> String {
    DEFAULT_COLLECTION_PREFIX.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            collection_prefix: default_collection_prefix(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Chunk size pre-filled in the upload form.
    #[serde(default = "default_ui_chunk_size")]
    pub default_chunk_size: usize,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_ui_chunk_size() -> usize {
    DEFAULT_UI_CHUNK_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_chunk_size: default_ui_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_idle_timeout() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    #[serde(default)]
    pub keep_files: bool,
}

fn default_upload_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("docqa").join("uploads"))
        .unwrap_or_else(|| PathBuf::from("uploads"))
}

fn default_max_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_bytes: default_max_bytes(),
            keep_files: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.chat.model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.chunking.chunk_size, 256);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.server.default_chunk_size, 512);
        assert_eq!(config.vector_store.driver, VectorDriver::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 1000
            strategy = "recursive"

            [vector_store]
            driver = "qdrant"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.chunking.strategy, ChunkStrategy::Recursive);
        assert_eq!(config.vector_store.driver, VectorDriver::Qdrant);
        assert_eq!(config.embedding.batch_size, 100);
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_k_out_of_range() {
        let mut config = Config::default();
        config.retrieval.k = 21;
        assert!(config.validate().is_err());
        config.retrieval.k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_non_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1"),
            ("DOCQA_VECTOR_DRIVER", "qdrant"),
            ("DOCQA_BIND", "   "),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.base_url, "http://localhost:9999/v1");
        assert_eq!(config.vector_store.driver, VectorDriver::Qdrant);
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_api_key_not_serialized_when_absent() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!content.contains("api_key"));
    }
}
