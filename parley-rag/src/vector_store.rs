//! Vector index over embedded documents

use crate::embeddings::{cosine_similarity, Embedder};
use crate::filter::Filter;
use async_trait::async_trait;
use parley_core::{Document, ErrorContext, ExternalService, ParleyError, ParleyResult};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A document with its relevance to a query, higher is closer
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// Similarity search over stored document embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return at most `k` documents passing `pre_filter`, most relevant first.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        pre_filter: &Filter,
    ) -> ParleyResult<Vec<ScoredDocument>>;

    async fn add_documents(&self, documents: Vec<EmbeddedDocument>) -> ParleyResult<usize>;

    fn name(&self) -> &str;
}

/// Process-local index using cosine relevance
pub struct InMemoryVectorIndex {
    name: String,
    documents: RwLock<Vec<EmbeddedDocument>>,
}

impl InMemoryVectorIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        pre_filter: &Filter,
    ) -> ParleyResult<Vec<ScoredDocument>> {
        let documents = self.documents.read().await;

        let mut scored: Vec<ScoredDocument> = documents
            .iter()
            .filter(|doc| pre_filter.matches(&doc.document.metadata))
            .map(|doc| ScoredDocument {
                document: doc.document.clone(),
                score: cosine_similarity(embedding, &doc.embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        debug!(
            "Index {} returned {} of {} documents",
            self.name,
            scored.len(),
            documents.len()
        );

        Ok(scored)
    }

    async fn add_documents(&self, documents: Vec<EmbeddedDocument>) -> ParleyResult<usize> {
        let mut stored = self.documents.write().await;

        let expected = stored
            .first()
            .or_else(|| documents.first())
            .map(|d| d.embedding.len());
        if let Some(expected) = expected {
            if let Some(bad) = documents.iter().find(|d| d.embedding.len() != expected) {
                return Err(parley_core::validation_error!(
                    format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        expected,
                        bad.embedding.len()
                    ),
                    "embedding",
                    "vector_store"
                ));
            }
        }

        let added = documents.len();
        stored.extend(documents);

        info!(
            "Added {} documents to index {} (total: {})",
            added,
            self.name,
            stored.len()
        );
        Ok(added)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Load a JSON-lines seed file, embed it in batches and add it to `index`.
///
/// Each non-blank line is a `{"page_content": ..., "metadata": {...}}` record.
pub async fn load_seed_file(
    path: &Path,
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    batch_size: usize,
) -> ParleyResult<usize> {
    let content = tokio::fs::read_to_string(path).await?;

    let mut documents = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(line).map_err(|e| ParleyError::Config {
            message: format!(
                "Invalid seed record at {}:{}: {}",
                path.display(),
                line_no + 1,
                e
            ),
            source: Some(Box::new(e)),
            context: ErrorContext::new("vector_store")
                .with_operation("load_seed_file")
                .with_suggestion("Each line must be a JSON object with page_content and metadata"),
        })?;
        documents.push(document);
    }

    if documents.is_empty() {
        warn!("Seed file {} contains no documents", path.display());
        return Ok(0);
    }

    let mut added = 0;
    for batch in documents.chunks(batch_size.max(1)) {
        let texts = batch.iter().map(|d| d.page_content.clone()).collect();
        let embeddings = embedder.embed(texts).await?;
        if embeddings.len() != batch.len() {
            return Err(ParleyError::external_msg(
                ExternalService::Embedding,
                "vector_store",
                format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                ),
            ));
        }

        let embedded = batch
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(document, embedding)| EmbeddedDocument {
                document,
                embedding,
            })
            .collect();
        added += index.add_documents(embedded).await?;
    }

    info!(
        "Seeded index {} with {} documents from {}",
        index.name(),
        added,
        path.display()
    );
    Ok(added)
}
