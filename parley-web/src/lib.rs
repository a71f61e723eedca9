//! Parley Web Server
//!
//! Exposes the chat pipelines over HTTP using the runnable invoke envelope.

pub mod enrich;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::{ParleyServer, ParleyServerBuilder};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use parley_core::ParleyError;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    // Mirrors the request origin so the user_id cookie can be sent cross-origin
    let cors = CorsLayer::very_permissive();

    Router::new()
        .merge(routes::invoke_routes())
        .merge(routes::utility_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] ParleyError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let error = match self {
            WebError::Core(error) => error,
            WebError::Server(e) => ParleyError::Io(e),
        };
        error.log();

        let (status, error_code, message) = match &error {
            ParleyError::Validation { message, .. } => {
                (StatusCode::BAD_REQUEST, "validation_error", message.clone())
            }
            ParleyError::MissingIdentity { message, .. } => {
                (StatusCode::BAD_REQUEST, "missing_identity", message.clone())
            }
            ParleyError::ExternalService { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "external_service_error",
                error.to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                error.to_string(),
            ),
        };

        let error_id = error.context().map(|c| c.error_id.clone());
        let body = Json(json!({
            "error": error_code,
            "message": message,
            "error_id": error_id,
            "suggestions": error.suggestions(),
        }));

        (status, body).into_response()
    }
}
