//! Route definitions for the Parley web server

use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Invoke routes for each served runnable.
///
/// Only `invoke` is mounted; batch, stream and playground sub-routes are not.
pub fn invoke_routes() -> Router<AppState> {
    Router::new()
        .route("/base/invoke", post(handlers::invoke_base))
        .route("/rag/invoke", post(handlers::invoke_rag))
        .route("/openai/invoke", post(handlers::invoke_model))
}

/// Health check and cookie helper
pub fn utility_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/set-cookie/", get(handlers::set_cookie))
}
