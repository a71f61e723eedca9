//! Parley Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use parley_core::{ParleyConfig, ServerConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main Parley web server
pub struct ParleyServer {
    server: ServerConfig,
    state: AppState,
}

impl ParleyServer {
    /// Create a server, building every collaborator from `config`
    pub async fn new(config: ParleyConfig) -> WebResult<Self> {
        let server = config.server.clone();
        let state = AppState::new(config).await?;

        Ok(Self { server, state })
    }

    /// Start the web server and run until Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.server.address();

        info!("Starting Parley Web Server");
        info!("Server address: http://{}", address);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server shut down gracefully");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Builder for ParleyServer
pub struct ParleyServerBuilder {
    config: ParleyConfig,
}

impl ParleyServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: ParleyConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn config(mut self, config: ParleyConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the message store database URL
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.history.database_url = database_url.into();
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<ParleyServer> {
        ParleyServer::new(self.config).await
    }
}

impl Default for ParleyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let builder = ParleyServerBuilder::new()
            .host("0.0.0.0")
            .port(9100)
            .database_url("sqlite::memory:");

        assert_eq!(builder.config.server.address(), "0.0.0.0:9100");
        assert_eq!(builder.config.history.database_url, "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let mut config = ParleyConfig::default();
        config.vector.top_k = 0;

        let result = ParleyServerBuilder::new().config(config).build().await;
        assert!(matches!(result, Err(WebError::Core(_))));
    }
}
