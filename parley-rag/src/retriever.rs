//! Context retrieval for the retrieval-augmented pipeline

use crate::embeddings::Embedder;
use crate::filter::Filter;
use crate::vector_store::VectorIndex;
use parley_core::{Document, ParleyResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Separator placed between retrieved documents in the context string
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

pub const DEFAULT_TOP_K: usize = 3;

/// Fetches the documents most relevant to a question
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `top_k` documents matching `filter`, most relevant first.
    pub async fn retrieve(&self, question: &str, filter: &Value) -> ParleyResult<Vec<Document>> {
        // Reject a malformed filter before paying for an embedding call
        let filter = Filter::parse(filter)?;
        let start_time = Instant::now();

        let embedding = self.embedder.embed_query(question).await?;
        let results = self
            .index
            .similarity_search(&embedding, self.top_k, &filter)
            .await?;

        info!(
            "Retrieved {} documents from {} in {:?}",
            results.len(),
            self.index.name(),
            start_time.elapsed()
        );
        for (i, result) in results.iter().enumerate() {
            debug!("  {}: score {:.3}", i + 1, result.score);
        }

        Ok(results.into_iter().map(|r| r.document).collect())
    }

    /// Retrieve documents and join their text into one context string.
    pub async fn retrieve_context(&self, question: &str, filter: &Value) -> ParleyResult<String> {
        let documents = self.retrieve(question, filter).await?;
        Ok(format_docs(&documents))
    }
}

/// Join document text with blank lines; empty input gives the empty string
pub fn format_docs(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
