use thiserror::Error;

use crate::core::errors::{ApiError, ConfigError};
use crate::docs::DatasetError;
use crate::rag::RetrievalError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load dataset (run `nips scrape` first): {0}")]
    Dataset(#[from] DatasetError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] ApiError),

    #[error("Failed to build retrieval index: {0}")]
    Retrieval(#[from] RetrievalError),
}
