use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{
    require_secret, resolve_secret, AppConfig, AppPaths, ConfigService, RetrievalStrategy,
};
use crate::docs::load_jsonl;
use crate::llm::{build_embedder, build_provider};
use crate::qa::QaService;
use crate::rag::{EmbeddingRetriever, KeywordRetriever, Retriever};

pub mod error;

use error::InitializationError;

/// Shared, read-only state behind every route and the chat loop.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub qa: Arc<QaService>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// 1. Loads and validates the configuration
    /// 2. Resolves the upstream token (missing token is fatal)
    /// 3. Loads the scraped dataset and builds the retriever
    /// 4. Creates the upstream LLM provider
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone()).load()?;
        Self::from_config(paths, config).await
    }

    pub async fn from_config(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let upstream = &config.upstream;
        let token = require_secret(
            "upstream.api_token",
            &upstream.token_env,
            upstream.api_token.as_deref(),
        )?;

        let dataset_path = paths.resolve(
            config
                .retrieval
                .dataset
                .as_deref()
                .unwrap_or(config.scraping.output.jsonl.as_path()),
        );
        let records = load_jsonl(&dataset_path)?;
        tracing::info!(
            "Loaded {} records from {}",
            records.len(),
            dataset_path.display()
        );

        let timeout = Duration::from_secs(upstream.timeout_secs);
        let retriever: Arc<dyn Retriever> = match config.retrieval.strategy {
            RetrievalStrategy::Keyword => Arc::new(KeywordRetriever::new(records)),
            RetrievalStrategy::Embedding => {
                let embed_token = resolve_secret(
                    &config.retrieval.embedding_token_env,
                    config.retrieval.embedding_api_key.as_deref(),
                );
                let embedder = build_embedder(&config.retrieval, embed_token, timeout)
                    .map_err(InitializationError::Llm)?;
                Arc::new(EmbeddingRetriever::build(records, embedder).await?)
            }
        };

        let provider = build_provider(upstream, token).map_err(InitializationError::Llm)?;
        let qa = QaService::new(
            retriever,
            provider,
            config.chat.system_prompt.clone(),
            config.retrieval.top_k,
            timeout,
        );

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            qa: Arc::new(qa),
        }))
    }
}
