//! Configuration management for docchat
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Document registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Reranker configuration
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Generation service configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Long-term memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Document registry collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the document listing endpoint
    #[serde(default = "default_registry_url")]
    pub base_url: String,
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

    /// Backend kind: "http" or "local" (requires the local-embed feature)
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    /// Backend URL for the http backend
    #[serde(default = "default_embedding_backend_url")]
    pub backend_url: String,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        "BAAI/bge-large-en-v1.5" => Some(1024),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model.
    ///
    /// A collection is bound to one model and one dimension for its whole
    /// lifetime; changing the model requires a full rebuild into a fresh
    /// collection.
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension, self.model, expected, expected
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
    /// Sentences per chunk
    #[serde(default = "default_chunk_max_sentences")]
    pub max_sentences: usize,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of results returned after reranking
    #[serde(default = "default_query_top_k")]
    pub top_k: usize,

    /// Number of dense candidates fetched before reranking
    #[serde(default = "default_query_fetch_k")]
    pub fetch_k: usize,
}

impl QueryConfig {
    /// Over-fetch size for a given final k (never below 2x the final k)
    pub fn fetch_for(&self, k: usize) -> usize {
        self.fetch_k.max(k * 2)
    }
}

/// Reranker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Whether reranking is applied at query time
    #[serde(default = "default_reranker_enabled")]
    pub enabled: bool,

    /// Cross-encoder model name
    #[serde(default = "default_reranker_model")]
    pub model: String,

    /// Backend kind: "http" or "local" (requires the local-embed feature)
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    /// Backend URL for the http backend
    #[serde(default = "default_embedding_backend_url")]
    pub backend_url: String,
}

/// Generation service configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generation service
    #[serde(default = "default_generation_url")]
    pub base_url: String,

    /// Model identifier sent with each request
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Environment variable holding the API key (empty = no auth header)
    #[serde(default = "default_generation_api_key_env")]
    pub api_key_env: String,

    /// Prior conversation turns included in the prompt
    #[serde(default = "default_generation_history_turns")]
    pub history_turns: usize,
}

/// Long-term memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard ceiling on stored memory per user, in characters
    #[serde(default = "default_memory_max_chars")]
    pub max_chars: usize,

    /// Target size when compacting, in characters
    #[serde(default = "default_memory_summary_target_chars")]
    pub summary_target_chars: usize,

    /// Maximum length of one interaction snippet, in characters
    #[serde(default = "default_memory_snippet_max_chars")]
    pub snippet_max_chars: usize,
}

/// Resolved filesystem paths
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Directory holding config and data
    pub data_dir: PathBuf,
    /// Config file location
    pub config_file: PathBuf,
    /// SQLite database location
    pub db_file: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            backend: default_embedding_backend(),
            backend_url: default_embedding_backend_url(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_sentences: default_chunk_max_sentences(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_query_top_k(),
            fetch_k: default_query_fetch_k(),
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: default_reranker_enabled(),
            model: default_reranker_model(),
            backend: default_embedding_backend(),
            backend_url: default_embedding_backend_url(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            model: default_generation_model(),
            api_key_env: default_generation_api_key_env(),
            history_turns: default_generation_history_turns(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_chars: default_memory_max_chars(),
            summary_target_chars: default_memory_summary_target_chars(),
            snippet_max_chars: default_memory_snippet_max_chars(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            collection_name: default_collection_name(),
            registry: RegistryConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            query: QueryConfig::default(),
            reranker: RerankerConfig::default(),
            generation: GenerationConfig::default(),
            memory: MemoryConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Resolve the default data directory (~/.local/share/docchat or platform equivalent)
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join("docchat"))
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
}

impl Config {
    /// Build a config with paths anchored at the given data directory
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let mut config = Config::default();
        config.paths = PathsConfig {
            config_file: data_dir.join("config.toml"),
            db_file: data_dir.join("docchat.db"),
            data_dir,
        };
        config
    }

    /// Load configuration from a file, or from the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_file, data_dir) = match path {
            Some(p) => (
                p.to_path_buf(),
                p.parent().map(Path::to_path_buf).unwrap_or_default(),
            ),
            None => {
                let dir = default_data_dir()?;
                (dir.join("config.toml"), dir)
            }
        };

        if !config_file.exists() {
            return Err(Error::NotInitialized);
        }

        debug!("Loading config from {:?}", config_file);
        let contents = std::fs::read_to_string(&config_file)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.paths = PathsConfig {
            config_file,
            db_file: data_dir.join("docchat.db"),
            data_dir,
        };
        Ok(config)
    }

    /// Save configuration to its config file location
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.collection_name, config.collection_name);
        assert_eq!(parsed.chunk.max_sentences, 5);
        assert_eq!(parsed.query.top_k, 3);
        assert_eq!(parsed.memory.max_chars, 4000);
    }

    #[test]
    fn test_resolved_dimension_overrides_mismatch() {
        let config = EmbeddingConfig {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 768,
            ..Default::default()
        };

        assert_eq!(config.resolved_dimension(), 384);
    }

    #[test]
    fn test_fetch_for_never_below_double_k() {
        let query = QueryConfig {
            top_k: 3,
            fetch_k: 10,
        };

        assert_eq!(query.fetch_for(3), 10);
        assert_eq!(query.fetch_for(8), 16);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.query.fetch_k, 10);
        assert_eq!(parsed.generation.history_turns, 6);
    }
}
