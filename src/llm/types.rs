use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::UpstreamConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling and transport settings shared by all providers.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u64,
    pub temperature: Option<f64>,
    pub timeout: Duration,
}

impl GenerationParams {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_new_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}
