//! Unified error handling system
//!
//! Every failure that can leave the core is one of four kinds: a malformed
//! identifier, a missing caller identity, a failing external collaborator, or
//! a broken startup configuration. Each carries an [`ErrorContext`] so the
//! caller gets an error id to quote and recovery suggestions to act on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type ParleyResult<T> = Result<T, ParleyError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Which external collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalService {
    Model,
    Embedding,
    VectorIndex,
    MessageStore,
}

impl std::fmt::Display for ExternalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExternalService::Model => "language model",
            ExternalService::Embedding => "embedding service",
            ExternalService::VectorIndex => "vector index",
            ExternalService::MessageStore => "message store",
        };
        f.write_str(name)
    }
}

/// Main error type for Parley
#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Missing identity: {message}")]
    MissingIdentity {
        message: String,
        context: ErrorContext,
    },

    #[error("{service} error: {message}")]
    ExternalService {
        service: ExternalService,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ParleyError {
    /// Failure reported by an external collaborator, kept with its source.
    pub fn external<E>(service: ExternalService, component: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ParleyError::ExternalService {
            service,
            message: source.to_string(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(component),
        }
    }

    /// Failure reported by an external collaborator without an error value.
    pub fn external_msg(service: ExternalService, component: &str, message: impl Into<String>) -> Self {
        ParleyError::ExternalService {
            service,
            message: message.into(),
            source: None,
            context: ErrorContext::new(component),
        }
    }

    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ParleyError::Validation { context, .. } => Some(context),
            ParleyError::MissingIdentity { context, .. } => Some(context),
            ParleyError::ExternalService { context, .. } => Some(context),
            ParleyError::Config { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the caller caused the error and can fix it by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ParleyError::Validation { .. } | ParleyError::MissingIdentity { .. }
        )
    }

    /// Recovery suggestions attached to the error, if any
    pub fn suggestions(&self) -> &[String] {
        self.context()
            .map(|c| c.recovery_suggestions.as_slice())
            .unwrap_or(&[])
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            ParleyError::Validation { .. } | ParleyError::MissingIdentity { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Rejected request"
                );
            }
            ParleyError::ExternalService { service, .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    service = %service,
                    error = %self,
                    "External service failed"
                );
            }
            ParleyError::Config { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration error"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::ParleyError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file and PARLEY_* environment variables"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::ParleyError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file and PARLEY_* environment variables"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::ParleyError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
