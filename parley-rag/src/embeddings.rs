//! Text embedding
//!
//! Both the seeding path and the retriever embed through [`Embedder`]; the
//! siumai-backed implementation splits large inputs into provider batches.

use crate::llm_client::api_key;
use async_trait::async_trait;
use parley_core::{EmbeddingConfig, ExternalService, ParleyError, ParleyResult};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Converts texts into dense vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> ParleyResult<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> ParleyResult<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ParleyError::external_msg(
                    ExternalService::Embedding,
                    "embeddings",
                    "No embedding data returned",
                )
            })
    }
}

/// Embedder backed by a siumai client
pub struct SiumaiEmbedder {
    client: Box<dyn LlmClient>,
    config: EmbeddingConfig,
}

impl SiumaiEmbedder {
    pub async fn new(config: EmbeddingConfig) -> ParleyResult<Self> {
        let client: Box<dyn LlmClient> = match config.provider.as_str() {
            "openai" => {
                let api_key = api_key(config.api_key.as_deref(), "OPENAI_API_KEY", "OpenAI")?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model);

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                Box::new(builder.build().await.map_err(|e| {
                    parley_core::config_error!(
                        format!("Failed to create OpenAI embedding client: {}", e),
                        "embeddings"
                    )
                })?)
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                Box::new(
                    LlmBuilder::new()
                        .ollama()
                        .model(&config.model)
                        .base_url(&base_url)
                        .build()
                        .await
                        .map_err(|e| {
                            parley_core::config_error!(
                                format!("Failed to create Ollama embedding client: {}", e),
                                "embeddings"
                            )
                        })?,
                )
            }
            provider => {
                return Err(parley_core::config_error!(
                    format!("Unsupported embedding provider: {}", provider),
                    "embeddings"
                ));
            }
        };

        info!(
            "Initialized embedding client - Provider: {}, Model: {}, Batch Size: {}",
            config.provider, config.model, config.batch_size
        );

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for SiumaiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> ParleyResult<Vec<Vec<f32>>> {
        let embedding_client = self.client.as_embedding_capability().ok_or_else(|| {
            parley_core::config_error!(
                format!(
                    "Provider {} does not support embeddings",
                    self.config.provider
                ),
                "embeddings"
            )
        })?;

        let start_time = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            debug!(
                "Calling embedding API - Model: {}, Batch: {} texts",
                self.config.model,
                batch.len()
            );

            let response = embedding_client
                .embed(batch.to_vec())
                .await
                .map_err(|e| ParleyError::external(ExternalService::Embedding, "embeddings", e))?;

            if response.embeddings.len() != batch.len() {
                return Err(ParleyError::external_msg(
                    ExternalService::Embedding,
                    "embeddings",
                    format!(
                        "Expected {} embeddings, got {}",
                        batch.len(),
                        response.embeddings.len()
                    ),
                ));
            }

            embeddings.extend(response.embeddings);
        }

        debug!(
            "Embedded {} texts in {:?}",
            embeddings.len(),
            start_time.elapsed()
        );

        Ok(embeddings)
    }
}

/// Cosine similarity between two vectors; 0.0 on length mismatch or zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
