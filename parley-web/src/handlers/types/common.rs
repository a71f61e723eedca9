//! Common types used across multiple handlers

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Query string of `GET /set-cookie/`
#[derive(Debug, Deserialize)]
pub struct SetCookieQuery {
    pub user_id: String,
}

/// Body of the set-cookie response
#[derive(Debug, Serialize, Deserialize)]
pub struct CookieResponse {
    pub message: String,
    pub value: String,
}
