use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::GenerationParams;
use crate::core::errors::ApiError;

const POLL_INTERVAL: Duration = Duration::from_millis(750);

/// Hosted models on Replicate's predictions API.
#[derive(Clone)]
pub struct ReplicateProvider {
    base_url: String,
    token: String,
    params: GenerationParams,
    client: Client,
}

impl ReplicateProvider {
    pub fn new(base_url: String, token: String, params: GenerationParams) -> Result<Self, ApiError> {
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

    fn predictions_url(&self) -> String {
        format!(
            "{}/v1/models/{}/predictions",
            self.base_url, self.params.model
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let res = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::UpstreamUnavailable(format!(
                "Replicate returned {}: {}",
                status, text
            )));
        }

        res.json().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::UpstreamUnavailable(format!(
                "Replicate timed out after {}s",
                self.params.timeout.as_secs()
            ))
        } else {
            ApiError::upstream(err)
        }
    }
}

#[async_trait]
impl LlmProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let mut input = json!({
            "prompt": prompt,
            "max_new_tokens": self.params.max_tokens,
        });
        if let (Some(obj), Some(t)) = (input.as_object_mut(), self.params.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        tracing::info!("Sending prompt to Replicate ({} chars)", prompt.len());
        let deadline = Instant::now() + self.params.timeout;
        let mut prediction = self
            .send(
                self.client
                    .post(self.predictions_url())
                    .header("Prefer", "wait")
                    .json(&json!({ "input": input })),
            )
            .await?;

        loop {
            match prediction["status"].as_str().unwrap_or("succeeded") {
                "succeeded" => break,
                "failed" | "canceled" => {
                    let reason = prediction["error"]
                        .as_str()
                        .unwrap_or("prediction did not succeed")
                        .to_string();
                    return Err(ApiError::UpstreamUnavailable(reason));
                }
                _ => {}
            }

            let Some(poll_url) = prediction["urls"]["get"].as_str().map(str::to_string) else {
                return Err(ApiError::UpstreamUnavailable(
                    "prediction is still running but has no poll URL".to_string(),
                ));
            };
            if Instant::now() + POLL_INTERVAL > deadline {
                return Err(ApiError::UpstreamUnavailable(format!(
                    "Replicate timed out after {}s",
                    self.params.timeout.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.send(self.client.get(poll_url)).await?;
        }

        let output = collect_output(&prediction["output"]).ok_or_else(|| {
            ApiError::UpstreamUnavailable("Replicate returned no output".to_string())
        })?;
        tracing::info!("Replicate response: {} chars", output.len());
        Ok(output)
    }
}

/// Language models stream output as an array of fragments; some return a
/// single string.
fn collect_output(output: &Value) -> Option<String> {
    let text = match output {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => {
                    tracing::warn!("Unknown output item type, coercing to string: {}", other);
                    other.to_string()
                }
            })
            .collect(),
        Value::Null => return None,
        other => other.to_string(),
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}
