use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{ChatMessage, GenerationParams};
use crate::core::errors::ApiError;

/// Any OpenAI-compatible `/v1` endpoint (OpenAI, vLLM, LM Studio, ...).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    token: Option<String>,
    params: GenerationParams,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: String,
        token: Option<String>,
        params: GenerationParams,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(params.timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            params,
            client,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::UpstreamUnavailable(format!(
                    "{} timed out after {}s",
                    url,
                    self.params.timeout.as_secs()
                ))
            } else {
                ApiError::upstream(e)
            }
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::UpstreamUnavailable(format!(
                "{} returned {}: {}",
                path, status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let mut body = json!({
            "model": self.params.model,
            "messages": [ChatMessage::user(prompt)],
            "max_tokens": self.params.max_tokens,
            "stream": false,
        });
        if let (Some(obj), Some(t)) = (body.as_object_mut(), self.params.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        let payload = self.post("/v1/chat/completions", &body).await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if content.is_empty() {
            return Err(ApiError::UpstreamUnavailable(
                "chat completion returned no content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let body = json!({
            "model": self.params.model,
            "input": inputs,
        });

        let payload = self.post("/v1/embeddings", &body).await?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}
