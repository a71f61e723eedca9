//! Parley RAG - conversation pipelines
//!
//! Chat model and embedding adapters over siumai, the vector index and
//! retriever, message-log history, prompt templates and the pipelines that
//! compose them.

pub mod embeddings;
pub mod filter;
pub mod history;
pub mod llm_client;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod storage;
pub mod vector_store;

pub use embeddings::*;
pub use filter::Filter;
pub use history::*;
pub use llm_client::{ChatModel, SiumaiChatModel};
pub use pipeline::*;
pub use prompt::*;
pub use retriever::*;
pub use storage::*;
pub use vector_store::*;
