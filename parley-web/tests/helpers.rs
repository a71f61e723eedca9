//! Integration test helpers
//!
//! Builds the full application over in-memory backends with a scripted chat
//! model and a keyword embedder, so no test touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use parley_core::{
    ChatMessage, Document, ExternalService, ParleyConfig, ParleyError, ParleyResult,
};
use parley_rag::{
    ChatModel, EmbeddedDocument, Embedder, InMemoryMessageLogStore, InMemoryVectorIndex,
    VectorIndex,
};
use parley_web::{create_app, AppState};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::net::TcpListener;

// Make sure tracing is only initialized once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// Replies "reply N to: <last message>" and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    pub fail: bool,
}

impl ScriptedModel {
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: Vec<ChatMessage>) -> ParleyResult<String> {
        if self.fail {
            return Err(ParleyError::external_msg(
                ExternalService::Model,
                "scripted_model",
                "deployment unavailable",
            ));
        }

        let mut prompts = self.prompts.lock().unwrap();
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        prompts.push(messages);
        Ok(format!("reply {} to: {}", prompts.len(), last))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub const TOPICS: [&str; 3] = ["refund", "shipping", "password"];

/// One dimension per entry of [`TOPICS`] plus a constant bias
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> ParleyResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                TOPICS
                    .iter()
                    .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                    .chain(std::iter::once(0.05))
                    .collect()
            })
            .collect())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub model: Arc<ScriptedModel>,
    pub store: Arc<InMemoryMessageLogStore>,
}

/// Build state over in-memory backends seeded with a few support documents
pub async fn test_state(model: ScriptedModel, rag_with_history: bool) -> TestContext {
    LazyLock::force(&TRACING);

    let mut config = ParleyConfig::default();
    config.rag.with_history = rag_with_history;

    let model = Arc::new(model);
    let embedder = Arc::new(KeywordEmbedder);
    let store = Arc::new(InMemoryMessageLogStore::new());
    let index = Arc::new(InMemoryVectorIndex::new("test_index"));

    let docs = [
        ("Refunds are issued within five days.", "billing"),
        ("Shipping is free over fifty euros.", "logistics"),
        ("Reset your password from the login page.", "account"),
        ("Refund requests need an order number.", "billing"),
    ];
    let texts = docs.iter().map(|(text, _)| text.to_string()).collect();
    let embeddings = embedder.embed(texts).await.unwrap();
    let embedded = docs
        .iter()
        .zip(embeddings)
        .map(|((text, category), embedding)| EmbeddedDocument {
            document: Document::new(*text).with_metadata("category", *category),
            embedding,
        })
        .collect();
    index.add_documents(embedded).await.unwrap();

    let state = AppState::from_parts(config, model.clone(), embedder, store.clone(), index);

    TestContext {
        state,
        model,
        store,
    }
}

/// Test application instance listening on a local port
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub context: TestContext,
}

impl TestApp {
    pub async fn set_cookie(&self, user_id: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/set-cookie/", &self.address))
            .query(&[("user_id", user_id)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_invoke<Body>(&self, route: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/{}/invoke", &self.address, route))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_health(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/health", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Spawn the app on a free port with a cookie-keeping client
pub async fn spawn_app() -> TestApp {
    let context = test_state(ScriptedModel::default(), true).await;
    let app = create_app(context.state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: client,
        context,
    }
}
