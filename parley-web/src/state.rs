//! Application state shared by all handlers

use parley_core::{ParleyConfig, ParleyResult};
use parley_rag::{
    load_seed_file, ChatModel, ChatPipeline, Embedder, HistoryResolver, InMemoryVectorIndex,
    MessageLogStore, Retriever, SiumaiChatModel, SiumaiEmbedder, SqliteMessageLogStore,
    VectorIndex,
};
use std::sync::Arc;
use tracing::info;

/// Long-lived handles created once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ParleyConfig>,
    /// Model behind every pipeline, also served directly
    pub model: Arc<dyn ChatModel>,
    /// Plain chat over stored history
    pub base: Arc<ChatPipeline>,
    /// Retrieval-augmented chat
    pub rag: Arc<ChatPipeline>,
}

impl AppState {
    /// Build the siumai clients, the message store and the seeded index.
    pub async fn new(config: ParleyConfig) -> ParleyResult<Self> {
        config.validate()?;

        let model: Arc<dyn ChatModel> = Arc::new(SiumaiChatModel::new(config.llm.clone()).await?);
        let embedder: Arc<dyn Embedder> =
            Arc::new(SiumaiEmbedder::new(config.embedding.clone()).await?);
        let store: Arc<dyn MessageLogStore> = Arc::new(
            SqliteMessageLogStore::connect(
                &config.history.database_url,
                &config.history.collection,
            )
            .await?,
        );
        let index: Arc<dyn VectorIndex> =
            Arc::new(InMemoryVectorIndex::new(config.vector.index_name.clone()));

        if let Some(seed_path) = &config.vector.seed_path {
            load_seed_file(
                seed_path,
                index.as_ref(),
                embedder.as_ref(),
                config.embedding.batch_size,
            )
            .await?;
        }

        Ok(Self::from_parts(config, model, embedder, store, index))
    }

    /// Assemble state from already constructed collaborators.
    pub fn from_parts(
        config: ParleyConfig,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn MessageLogStore>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let history = HistoryResolver::new(store);
        let retriever = Arc::new(Retriever::new(embedder, index).with_top_k(config.vector.top_k));

        let base = ChatPipeline::base(Arc::clone(&model), history.clone());
        let rag = ChatPipeline::rag(
            Arc::clone(&model),
            retriever,
            config.rag.with_history.then_some(history),
        );

        info!(
            "Pipelines ready: base {:?}, rag {:?}",
            base.stages(),
            rag.stages()
        );

        Self {
            config: Arc::new(config),
            model,
            base: Arc::new(base),
            rag: Arc::new(rag),
        }
    }
}
