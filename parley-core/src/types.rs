//! Core data type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[serde(alias = "user")]
    Human,
    #[serde(alias = "ai")]
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::Human => "human",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(MessageRole::System),
            "human" | "user" => Ok(MessageRole::Human),
            "assistant" | "ai" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// A single role-tagged message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Metadata describing one named slot of the per-call configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurableFieldSpec {
    /// Key under `configurable`
    pub id: &'static str,
    /// Display name used in error messages
    pub name: &'static str,
    pub description: &'static str,
    /// Value used when the caller leaves the slot unset
    pub default: &'static str,
    /// Whether concurrent calls may share the value
    pub is_shared: bool,
}

pub const USER_ID_FIELD: ConfigurableFieldSpec = ConfigurableFieldSpec {
    id: "user_id",
    name: "User ID",
    description: "Unique identifier for the user.",
    default: "",
    is_shared: true,
};

pub const CONVERSATION_ID_FIELD: ConfigurableFieldSpec = ConfigurableFieldSpec {
    id: "conversation_id",
    name: "Conversation ID",
    description: "Unique identifier for the conversation.",
    default: "",
    is_shared: true,
};

/// The `configurable` section of a [`RequestConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configurable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Any other configurable values, preserved untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Configurable {
    /// Look up a slot by its spec, falling back to the spec default.
    pub fn get_or_default(&self, spec: &ConfigurableFieldSpec) -> String {
        let value = match spec.id {
            "user_id" => self.user_id.clone(),
            "conversation_id" => self.conversation_id.clone(),
            other => self
                .extra
                .get(other)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        value.unwrap_or_else(|| spec.default.to_string())
    }

    fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.conversation_id.is_none() && self.extra.is_empty()
    }
}

/// Per-call configuration sent alongside an invocation
///
/// Created per request, enriched once with the caller identity and dropped
/// when the request completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Configurable::is_empty")]
    pub configurable: Configurable,
    /// Other top-level fields (tags, metadata, run name, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestConfig {
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.configurable.user_id = Some(user_id.into());
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.configurable.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn user_id(&self) -> String {
        self.configurable.get_or_default(&USER_ID_FIELD)
    }

    pub fn conversation_id(&self) -> String {
        self.configurable.get_or_default(&CONVERSATION_ID_FIELD)
    }
}

/// A document returned by the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
