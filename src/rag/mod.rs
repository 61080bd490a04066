//! Retrieval over the scraped Q/A dataset.
//!
//! - `Retriever`: keyword or embedding ranking of records
//! - `compose_prompt`: turns retrieved records into the upstream prompt

mod prompt;
mod retriever;
mod vector_math;

use thiserror::Error;

pub use prompt::compose_prompt;
pub use retriever::{EmbeddingRetriever, KeywordRetriever, Retriever};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding request failed: {0}")]
    Embedding(String),
    #[error("invalid embedding: {0}")]
    Dimension(String),
}
