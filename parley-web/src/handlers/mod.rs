//! HTTP request handlers for the Parley web server

pub mod cookie;
pub mod health;
pub mod invoke;
pub mod types;

// Re-export all handler functions
pub use cookie::*;
pub use health::*;
pub use invoke::*;

// Re-export all types for convenience
pub use types::*;
