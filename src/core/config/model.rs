//! Typed, immutable configuration built once at startup.
//!
//! Fine-tuning keys sit at the top level of the YAML document (the layout the
//! external trainer expects); everything else is grouped in sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub finetune: FineTuneConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMethod {
    Lora,
    Qlora,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    #[serde(default = "defaults::dataset_path")]
    pub path: PathBuf,
    #[serde(rename = "type", default = "defaults::dataset_type")]
    pub kind: String,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            path: defaults::dataset_path(),
            kind: defaults::dataset_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FineTuneConfig {
    pub base_model: String,
    pub adapter: AdapterMethod,
    pub datasets: Vec<DatasetSpec>,
    pub prompt_template: String,
    pub max_length: u64,
    pub batch_size: u64,
    pub num_epochs: u64,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub warmup_steps: u64,
    pub logging_steps: u64,
    pub save_steps: u64,
    pub output_dir: PathBuf,
    pub lora_r: u64,
    pub lora_alpha: u64,
    pub lora_dropout: f64,
    pub trainer_command: Vec<String>,
}

impl Default for FineTuneConfig {
    fn default() -> Self {
        Self {
            base_model: defaults::base_model(),
            adapter: AdapterMethod::Lora,
            datasets: vec![DatasetSpec::default()],
            prompt_template: defaults::prompt_template(),
            max_length: defaults::max_length(),
            batch_size: defaults::batch_size(),
            num_epochs: defaults::num_epochs(),
            learning_rate: defaults::learning_rate(),
            weight_decay: 0.0,
            warmup_steps: defaults::warmup_steps(),
            logging_steps: defaults::logging_steps(),
            save_steps: defaults::save_steps(),
            output_dir: defaults::output_dir(),
            lora_r: defaults::lora_r(),
            lora_alpha: defaults::lora_alpha(),
            lora_dropout: defaults::lora_dropout(),
            trainer_command: defaults::trainer_command(),
        }
    }
}

impl FineTuneConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.datasets
            .first()
            .map(|d| d.path.clone())
            .unwrap_or_else(defaults::dataset_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub min_heading_length: usize,
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// Explicit document URLs. Empty means the built-in NIP list.
    pub urls: Vec<String>,
    /// Scrape `*.md` files from a local checkout instead of fetching.
    pub local_dir: Option<PathBuf>,
    pub github: Option<GitHubSourceConfig>,
    pub output: ScrapeOutputConfig,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            min_heading_length: defaults::min_heading_length(),
            concurrency: defaults::concurrency(),
            fetch_timeout_secs: defaults::fetch_timeout_secs(),
            urls: Vec::new(),
            local_dir: None,
            github: None,
            output: ScrapeOutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutputConfig {
    #[serde(default = "defaults::dataset_path")]
    pub jsonl: PathBuf,
    #[serde(default = "defaults::csv_path")]
    pub csv: PathBuf,
}

impl Default for ScrapeOutputConfig {
    fn default() -> Self {
        Self {
            jsonl: defaults::dataset_path(),
            csv: defaults::csv_path(),
        }
    }
}

/// Private repository holding a `NIPS_URLS = [...]` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSourceConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "defaults::github_urls_file")]
    pub path: String,
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    Keyword,
    Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub strategy: RetrievalStrategy,
    pub top_k: usize,
    /// Defaults to `scraping.output.jsonl`.
    pub dataset: Option<PathBuf>,
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub embedding_token_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::Keyword,
            top_k: defaults::top_k(),
            dataset: None,
            embedding_model: defaults::embedding_model(),
            embedding_base_url: defaults::openai_base_url(),
            embedding_token_env: defaults::embedding_token_env(),
            embedding_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Replicate,
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub token_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub max_new_tokens: u64,
    pub temperature: Option<f64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Replicate,
            model: defaults::upstream_model(),
            base_url: None,
            token_env: defaults::upstream_token_env(),
            api_token: None,
            timeout_secs: defaults::upstream_timeout_secs(),
            max_new_tokens: defaults::max_new_tokens(),
            temperature: None,
        }
    }
}

impl UpstreamConfig {
    pub fn resolved_base_url(&self) -> String {
        let base = match (&self.base_url, self.provider) {
            (Some(url), _) => url.clone(),
            (None, ProviderKind::Replicate) => defaults::replicate_base_url(),
            (None, ProviderKind::Openai) => defaults::openai_base_url(),
        };
        base.trim_end_matches('/').to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: defaults::system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            cors_allowed_origins: defaults::cors_allowed_origins(),
        }
    }
}
