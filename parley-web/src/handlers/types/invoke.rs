//! Invoke envelope types
//!
//! Requests look like `{"input": ..., "config": {...}, "kwargs": {...}}` and
//! responses like `{"output": {"content": ..., "type": "ai"}, "metadata": {"run_id": ...}}`.

use parley_core::{ChatMessage, RequestConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InvokeRequest<I> {
    pub input: I,
    #[serde(default)]
    pub config: RequestConfig,
    /// Accepted for envelope compatibility; not used by any pipeline
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

/// Input of the plain chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub question: String,
}

/// Input of the retrieval-augmented endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RagQuestion {
    pub question: String,
    /// Metadata pre-filter passed to the vector index
    pub filter: Map<String, Value>,
}

/// Input of the direct model endpoint: a prompt string or a message list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelInput {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl ModelInput {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            ModelInput::Text(text) => vec![ChatMessage::human(text)],
            ModelInput::Messages(messages) => messages,
        }
    }
}

/// Assistant message returned by every invoke endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AiMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: "ai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub output: AiMessage,
    pub metadata: RunMetadata,
}

impl InvokeResponse {
    pub fn new(run_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            output: AiMessage::new(content),
            metadata: RunMetadata { run_id },
        }
    }
}
