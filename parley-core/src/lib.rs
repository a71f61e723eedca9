//! Parley Core - identifiers, shared types, errors, logging and configuration
//!
//! Nothing here talks to the network, so the retrieval and web crates can
//! depend on it without pulling in any external client.

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use identity::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
