//! Configuration management for kickoff-assistant
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Every field has a default, so running without a config file is normal.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "kickoff.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory containing the documents to index
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding the persisted vector store and metadata database
    #[serde(default = "default_persist_dir")]
    pub persist_dir: String,

    /// Vector store collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Descend into subdirectories of `data_dir`
    #[serde(default)]
    pub recursive: bool,

    /// Provider connection settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Chat model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Conversation configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Vector store backend selection
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Path the config was loaded from (internal)
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

/// OpenAI-compatible provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

/// Chat model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Optional cap on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Retries for failed embedding requests
    #[serde(default = "default_embedding_retries")]
    pub retries: usize,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                tracing::warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension,
                    self.model,
                    expected,
                    expected
                );
            }
            expected
        } else {
            self.dimension
        }
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Overlap characters between chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,

    /// Prefer breaking at heading boundaries
    #[serde(default = "default_prefer_heading_boundaries")]
    pub prefer_heading_boundaries: bool,

    /// Minimum chunk size (don't create tiny chunks)
    #[serde(default = "default_chunk_min_chars")]
    pub min_chars: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages retrieved per standalone question
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Most recent history messages included when condensing a question
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

/// Vector store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// "sqlite" (on-disk under persist_dir) or "qdrant"
    #[serde(default = "default_vector_store_backend")]
    pub backend: String,

    /// Qdrant connection URL, used when backend = "qdrant"
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Most conversations kept at once; the least recently used is dropped beyond this
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Conversations idle this long are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

/// Vector store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreBackend {
    Sqlite,
    Qdrant,
}

impl std::str::FromStr for VectorStoreBackend {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "sqlite" | "local" => Ok(Self::Sqlite),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(Error::Config(format!(
                "Unsupported vector store backend '{}'; expected 'sqlite' or 'qdrant'",
                value
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist_dir: default_persist_dir(),
            collection_name: default_collection_name(),
            recursive: false,
            openai: OpenAiConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
            vector_store: VectorStoreConfig::default(),
            server: ServerConfig::default(),
            config_file: None,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_openai_base_url(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            retries: default_embedding_retries(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            overlap_chars: default_chunk_overlap(),
            prefer_heading_boundaries: default_prefer_heading_boundaries(),
            min_chars: default_chunk_min_chars(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_store_backend(),
            qdrant_url: default_qdrant_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path (in the working directory)
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = Some(config_path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration for a run.
    ///
    /// An explicitly named file must exist. Without one, `kickoff.toml` in
    /// the working directory is used when present and defaults otherwise.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No config file found, using defaults");
                    let config = Config::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Write a config file with every default spelled out.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn init_file(path: &Path, force: bool) -> Result<Self> {
        if path.exists() && !force {
            return Err(Error::Config(format!(
                "Config already exists at {}. Use --force to overwrite.",
                path.display()
            )));
        }

        let mut config = Config::default();
        config.save(path)?;
        config.config_file = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Read the provider API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.openai.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::MissingCredential(self.openai.api_key_env.clone())),
        }
    }

    /// Selected vector store backend
    pub fn vector_store_backend(&self) -> Result<VectorStoreBackend> {
        self.vector_store.backend.parse()
    }

    /// Path of the on-disk vector store database
    pub fn vectors_db_path(&self) -> PathBuf {
        Path::new(&self.persist_dir).join("vectors.sqlite3")
    }

    /// Path of the metadata database
    pub fn metadata_db_path(&self) -> PathBuf {
        Path::new(&self.persist_dir).join("metadata.sqlite3")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chars < self.chunk.min_chars {
            return Err(Error::Config(
                "chunk.max_chars must be >= chunk.min_chars".to_string(),
            ));
        }

        if self.chunk.overlap_chars >= self.chunk.max_chars {
            return Err(Error::Config(
                "chunk.overlap_chars must be < chunk.max_chars".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".to_string()));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() || self.embedding.model.trim().is_empty() {
            return Err(Error::Config(
                "llm.model and embedding.model must not be empty".to_string(),
            ));
        }

        if self.collection_name.trim().is_empty() {
            return Err(Error::Config(
                "collection_name must not be empty".to_string(),
            ));
        }

        if self.server.max_sessions == 0 {
            return Err(Error::Config(
                "server.max_sessions must be positive".to_string(),
            ));
        }

        self.vector_store_backend()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.persist_dir, "chroma_db");
        assert_eq!(config.collection_name, "quickstart");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_sessions, 1000);
        assert_eq!(config.server.session_idle_secs, 1800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kickoff.toml");
        let mut config = Config::default();
        config.collection_name = "test_collection".to_string();
        config.retrieval.top_k = 4;

        config.save(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.collection_name, "test_collection");
        assert_eq!(loaded.retrieval.top_k, 4);
        assert_eq!(loaded.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_init_file_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kickoff.toml");

        let written = Config::init_file(&path, false).unwrap();
        assert_eq!(written.config_file.as_deref(), Some(path.as_path()));
        assert_eq!(Config::load(&path).unwrap().server.port, 8000);

        assert!(matches!(
            Config::init_file(&path, false),
            Err(Error::Config(_))
        ));
        assert!(Config::init_file(&path, true).is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kickoff.toml");
        std::fs::write(&path, "data_dir = \"docs\"\n[llm]\nmodel = \"gpt-4o\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.data_dir, "docs");
        assert_eq!(loaded.llm.model, "gpt-4o");
        assert_eq!(loaded.embedding.model, "text-embedding-ada-002");
        assert_eq!(loaded.chunk.overlap_chars, 200);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            Config::resolve(Some(&missing)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Invalid: overlap >= max
        config.chunk.overlap_chars = config.chunk.max_chars;
        assert!(config.validate().is_err());

        config.chunk.overlap_chars = 100;
        assert!(config.validate().is_ok());

        // Invalid: min > max
        config.chunk.min_chars = config.chunk.max_chars + 1;
        assert!(config.validate().is_err());
        config.chunk.min_chars = 10;

        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
        config.retrieval.top_k = 2;

        config.server.max_sessions = 0;
        assert!(config.validate().is_err());
        config.server.max_sessions = 10;

        config.vector_store.backend = "chroma".to_string();
        assert!(config.validate().is_err());
        config.vector_store.backend = "qdrant".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_from_env() {
        let mut config = Config::default();
        config.openai.api_key_env = "KICKOFF_TEST_KEY_PRESENT".to_string();
        std::env::set_var("KICKOFF_TEST_KEY_PRESENT", "sk-test");
        assert_eq!(config.api_key().unwrap(), "sk-test");

        config.openai.api_key_env = "KICKOFF_TEST_KEY_ABSENT".to_string();
        std::env::remove_var("KICKOFF_TEST_KEY_ABSENT");
        match config.api_key() {
            Err(Error::MissingCredential(var)) => assert_eq!(var, "KICKOFF_TEST_KEY_ABSENT"),
            other => panic!("expected missing credential, got {other:?}"),
        }
    }

    #[test]
    fn test_resolved_dimension_matches_model() {
        let mut config = Config::default();
        config.embedding.model = "text-embedding-3-large".to_string();
        config.embedding.dimension = 1536;

        assert_eq!(config.embedding.resolved_dimension(), 3072);
    }

    #[test]
    fn test_resolved_dimension_unknown_model_falls_back() {
        let mut config = Config::default();
        config.embedding.model = "custom-model".to_string();
        config.embedding.dimension = 512;

        assert_eq!(config.embedding.resolved_dimension(), 512);
    }

    #[test]
    fn test_persist_paths() {
        let mut config = Config::default();
        config.persist_dir = "/tmp/store".to_string();
        assert_eq!(
            config.vectors_db_path(),
            PathBuf::from("/tmp/store/vectors.sqlite3")
        );
        assert_eq!(
            config.metadata_db_path(),
            PathBuf::from("/tmp/store/metadata.sqlite3")
        );
    }
}
