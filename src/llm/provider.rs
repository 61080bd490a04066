use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "replicate", "openai")
    fn name(&self) -> &str;

    /// single-shot completion of an already composed prompt
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
