//! Type definitions for handlers
//!
//! This module contains the request/response types used by the handlers.

pub mod common;
pub mod invoke;

// Re-export all types for convenience
pub use common::*;
pub use invoke::*;
