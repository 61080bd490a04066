pub mod openai;
pub mod provider;
pub mod replicate;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use openai::OpenAiProvider;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use replicate::ReplicateProvider;
pub use types::{ChatMessage, GenerationParams};

use crate::core::config::{ProviderKind, RetrievalConfig, UpstreamConfig};
use crate::core::errors::ApiError;

/// Creates the completion backend selected by `upstream.provider`.
pub fn build_provider(
    config: &UpstreamConfig,
    token: String,
) -> Result<Arc<dyn LlmProvider>, ApiError> {
    let params = GenerationParams::from_config(config);
    let base_url = config.resolved_base_url();
    tracing::info!(
        "Using {:?} provider with model {} at {}",
        config.provider,
        config.model,
        base_url
    );

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Replicate => Arc::new(ReplicateProvider::new(base_url, token, params)?),
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(base_url, Some(token), params)?),
    };
    Ok(provider)
}

/// Creates the `/v1/embeddings` client used by embedding retrieval.
pub fn build_embedder(
    config: &RetrievalConfig,
    token: Option<String>,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>, ApiError> {
    let params = GenerationParams {
        model: config.embedding_model.clone(),
        max_tokens: 0,
        temperature: None,
        timeout,
    };
    Ok(Arc::new(OpenAiProvider::new(
        config.embedding_base_url.clone(),
        token,
        params,
    )?))
}
