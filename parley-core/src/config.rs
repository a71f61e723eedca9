//! Configuration management
//!
//! Configuration is read from an optional TOML file and then overridden by
//! `PARLEY_*` environment variables. It is resolved once at startup.

use crate::error::{ErrorContext, ParleyError, ParleyResult};
use crate::identity::is_valid_identifier;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub history: HistoryConfig,
    pub vector: VectorConfig,
    pub rag: RagSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Chat model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama, groq)
    pub provider: String,
    /// Model or deployment name
    pub model: String,
    /// API key (optional, can be set via environment)
    pub api_key: Option<String>,
    /// Base URL for OpenAI-compatible or self-hosted endpoints
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4-turbo".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider (openai, ollama)
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Number of texts sent per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key: None,
            base_url: None,
            batch_size: 16,
        }
    }
}

/// Message-log store location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// sqlx database URL; `sqlite::memory:` keeps history in process
    pub database_url: String,
    /// Table holding the message logs
    pub collection: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let db_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("history.db");

        Self {
            database_url: format!("sqlite://{}", db_path.display()),
            collection: "message_store".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub index_name: String,
    /// Number of documents retrieved per question
    pub top_k: usize,
    /// JSON-lines file of `{"page_content", "metadata"}` records loaded at startup
    pub seed_path: Option<PathBuf>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            index_name: "vector_index".to_string(),
            top_k: 3,
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Wrap the retrieval-augmented pipeline with conversation history
    pub with_history: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self { with_history: true }
    }
}

impl ParleyConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ParleyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ParleyError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| ParleyError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Override values from the process environment
    pub fn apply_env(&mut self) -> ParleyResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override values from `lookup`, which maps variable names to values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ParleyResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PARLEY_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PARLEY_PORT") {
            self.server.port = parse_var("PARLEY_PORT", &v)?;
        }

        if let Some(v) = lookup("PARLEY_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = lookup("PARLEY_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("PARLEY_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = lookup("PARLEY_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }

        if let Some(v) = lookup("PARLEY_EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Some(v) = lookup("PARLEY_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = lookup("PARLEY_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Some(v) = lookup("PARLEY_EMBEDDING_BATCH_SIZE") {
            self.embedding.batch_size = parse_var("PARLEY_EMBEDDING_BATCH_SIZE", &v)?;
        }

        if let Some(v) = lookup("PARLEY_HISTORY_DATABASE_URL") {
            self.history.database_url = v;
        }
        if let Some(v) = lookup("PARLEY_HISTORY_COLLECTION") {
            self.history.collection = v;
        }

        if let Some(v) = lookup("PARLEY_VECTOR_INDEX") {
            self.vector.index_name = v;
        }
        if let Some(v) = lookup("PARLEY_VECTOR_TOP_K") {
            self.vector.top_k = parse_var("PARLEY_VECTOR_TOP_K", &v)?;
        }
        if let Some(v) = lookup("PARLEY_VECTOR_SEED") {
            self.vector.seed_path = Some(PathBuf::from(v));
        }

        if let Some(v) = lookup("PARLEY_RAG_WITH_HISTORY") {
            self.rag.with_history = parse_var("PARLEY_RAG_WITH_HISTORY", &v)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ParleyResult<()> {
        if self.embedding.batch_size == 0 {
            return Err(invalid(
                "embedding.batch_size must be greater than 0",
                "Set embedding.batch_size to a positive value",
            ));
        }

        if self.vector.top_k == 0 {
            return Err(invalid(
                "vector.top_k must be greater than 0",
                "Set vector.top_k to a positive value",
            ));
        }

        // The collection name is spliced into SQL, so it must be a plain identifier.
        if !is_valid_identifier(&self.history.collection) || self.history.collection.contains('-') {
            return Err(invalid(
                format!("history.collection {:?} is not a valid table name", self.history.collection),
                "Use only letters, digits and underscores",
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> ParleyResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ParleyError::Config {
        message: format!("Invalid value {value:?} for {name}: {e}"),
        source: None,
        context: ErrorContext::new("config").with_operation("apply_env"),
    })
}

fn invalid(message: impl Into<String>, suggestion: &str) -> ParleyError {
    ParleyError::Config {
        message: message.into(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
