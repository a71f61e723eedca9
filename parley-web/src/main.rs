//! Parley Web Server
//!
//! Retrieval-augmented chat with per-user conversation history.

use anyhow::Context;
use clap::Parser;
use parley_core::{init_logging, ParleyConfig};
use parley_web::ParleyServerBuilder;
use std::path::PathBuf;
use tracing::{info, warn};

/// Parley Web Server - chat and retrieval-augmented chat over HTTP
#[derive(Parser)]
#[command(name = "parley-web")]
#[command(about = "HTTP interface for Parley")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = match &args.config {
        Some(path) => ParleyConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ParleyConfig::default(),
    };
    config.apply_env()?;

    // Override with command line arguments
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    info!(
        "Starting Parley on {} with {} model {}",
        config.server.address(),
        config.llm.provider,
        config.llm.model
    );
    if config.vector.seed_path.is_none() {
        warn!("No vector seed file configured; /rag/invoke will answer without context");
    }

    let server = ParleyServerBuilder::new()
        .config(config)
        .build()
        .await
        .context("failed to build server")?;

    server.start().await.context("server failed")?;

    Ok(())
}
