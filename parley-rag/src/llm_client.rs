//! Chat model integration using siumai
//!
//! [`ChatModel`] is the seam the pipelines invoke; [`SiumaiChatModel`] backs
//! it with any provider siumai supports.

use async_trait::async_trait;
use parley_core::{
    ChatMessage, ErrorContext, ExternalService, LlmConfig, MessageRole, ParleyError, ParleyResult,
};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// A model that turns a message list into one assistant reply
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: Vec<ChatMessage>) -> ParleyResult<String>;

    fn model_name(&self) -> &str;
}

/// Chat model backed by a siumai client
pub struct SiumaiChatModel {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl SiumaiChatModel {
    pub async fn new(config: LlmConfig) -> ParleyResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            "Created chat model for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self { client, config })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> ParleyResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = api_key(config.api_key.as_deref(), "OPENAI_API_KEY", "OpenAI")?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| build_failed("OpenAI", e))?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key =
                    api_key(config.api_key.as_deref(), "ANTHROPIC_API_KEY", "Anthropic")?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| build_failed("Anthropic", e))?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| build_failed("Ollama", e))?;

                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = api_key(config.api_key.as_deref(), "GROQ_API_KEY", "Groq")?;

                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| build_failed("Groq", e))?;

                Ok(Box::new(client))
            }
            provider => Err(parley_core::config_error!(
                format!("Unsupported LLM provider: {}", provider),
                "llm_client"
            )),
        }
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    async fn generate(&self, messages: Vec<ChatMessage>) -> ParleyResult<String> {
        let start_time = Instant::now();

        debug!("Generating response with {} messages", messages.len());

        let messages = messages.iter().map(to_siumai_message).collect::<Vec<_>>();

        let response = self.client.chat(messages).await.map_err(|e| {
            ParleyError::external(ExternalService::Model, "llm_client", e)
        })?;

        match response.content_text() {
            Some(content) => {
                info!(
                    "Generated response in {:?} ({} chars)",
                    start_time.elapsed(),
                    content.len()
                );
                Ok(content.to_string())
            }
            None => Err(ParleyError::external_msg(
                ExternalService::Model,
                "llm_client",
                "No text content in model response",
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn to_siumai_message(message: &ChatMessage) -> siumai::prelude::ChatMessage {
    let content = message.content.as_str();
    match message.role {
        MessageRole::System => siumai::prelude::ChatMessage::system(content).build(),
        MessageRole::Human => siumai::prelude::ChatMessage::user(content).build(),
        MessageRole::Assistant => siumai::prelude::ChatMessage::assistant(content).build(),
    }
}

/// Resolve an API key from config, falling back to the provider's env var.
pub(crate) fn api_key(configured: Option<&str>, env_var: &str, provider: &str) -> ParleyResult<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .ok_or_else(|| ParleyError::Config {
            message: format!("{} API key not found", provider),
            source: None,
            context: ErrorContext::new("llm_client")
                .with_operation("build_client")
                .with_suggestion(&format!("Set {} or provide api_key in the config file", env_var)),
        })
}

fn build_failed(provider: &str, e: impl std::fmt::Display) -> ParleyError {
    parley_core::config_error!(
        format!("Failed to build {} client: {}", provider, e),
        "llm_client"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };

        let result = SiumaiChatModel::new(config).await;
        assert!(matches!(result, Err(ParleyError::Config { .. })));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let key = api_key(Some("sk-test"), "PARLEY_TEST_UNSET_KEY", "Test").unwrap();
        assert_eq!(key, "sk-test");

        let err = api_key(None, "PARLEY_TEST_UNSET_KEY", "Test").unwrap_err();
        assert!(err.to_string().contains("Test API key not found"));
    }
}
