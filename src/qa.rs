use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::{compose_prompt, RetrievalError, Retriever};

#[derive(Debug, Error)]
pub enum QaError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
}

impl From<QaError> for ApiError {
    fn from(err: QaError) -> Self {
        match err {
            QaError::EmptyQuestion => ApiError::BadRequest(QaError::EmptyQuestion.to_string()),
            QaError::UpstreamUnavailable(message) => ApiError::UpstreamUnavailable(message),
            QaError::Retrieval(e) => ApiError::internal(e),
        }
    }
}

/// Answers questions with retrieval-augmented prompts. Holds no mutable
/// state and is shared across requests.
pub struct QaService {
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn LlmProvider>,
    system_prompt: String,
    top_k: usize,
    timeout: Duration,
}

impl QaService {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn LlmProvider>,
        system_prompt: String,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            provider,
            system_prompt,
            top_k,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn record_count(&self) -> usize {
        self.retriever.len()
    }

    pub async fn answer(&self, question: &str) -> Result<String, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }

        let context = if self.retriever.is_empty() {
            Vec::new()
        } else {
            self.retriever.retrieve(question, self.top_k).await?
        };
        tracing::debug!(
            "Retrieved {} context records via {}",
            context.len(),
            self.retriever.name()
        );
        let prompt = compose_prompt(&self.system_prompt, question, &context);

        let answer = match tokio::time::timeout(self.timeout, self.provider.generate(&prompt)).await
        {
            Ok(Ok(answer)) => answer,
            Ok(Err(ApiError::UpstreamUnavailable(message))) => {
                tracing::warn!("{} request failed: {}", self.provider.name(), message);
                return Err(QaError::UpstreamUnavailable(message));
            }
            Ok(Err(other)) => {
                tracing::warn!("{} request failed: {}", self.provider.name(), other);
                return Err(QaError::UpstreamUnavailable(other.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    "{} request timed out after {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                );
                return Err(QaError::UpstreamUnavailable(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(QaError::UpstreamUnavailable("empty output".to_string()));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::docs::QaRecord;
    use crate::rag::KeywordRetriever;

    #[derive(Default)]
    struct ScriptedProvider {
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
        reply: String,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_prompt.lock() {
                *last = Some(prompt.to_string());
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    fn service(provider: Arc<ScriptedProvider>, timeout: Duration) -> QaService {
        let records = vec![QaRecord {
            question: "What does Relays mean?".to_string(),
            answer: "Servers that accept and forward events.".to_string(),
        }];
        QaService::new(
            Arc::new(KeywordRetriever::new(records)),
            provider,
            "You are a helpful assistant specialized in the NIPS documentation.".to_string(),
            3,
            timeout,
        )
    }

    #[tokio::test]
    async fn empty_question_never_reaches_upstream() {
        let provider = Arc::new(ScriptedProvider {
            reply: "unused".to_string(),
            ..Default::default()
        });
        let qa = service(provider.clone(), Duration::from_secs(1));

        for question in ["", "   \n"] {
            assert!(matches!(qa.answer(question).await, Err(QaError::EmptyQuestion)));
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn answer_includes_retrieved_context_in_prompt() {
        let provider = Arc::new(ScriptedProvider {
            reply: "  Relays forward events.\n".to_string(),
            ..Default::default()
        });
        let qa = service(provider.clone(), Duration::from_secs(1));

        let answer = qa.answer("what are relays?").await.unwrap();

        assert_eq!(answer, "Relays forward events.");
        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Q: What does Relays mean?\nA: Servers that accept"));
        assert!(prompt.ends_with("User Question: what are relays?\nAnswer:"));
    }

    struct UnreachableRetriever;

    #[async_trait]
    impl Retriever for UnreachableRetriever {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn len(&self) -> usize {
            0
        }

        async fn retrieve(
            &self,
            _question: &str,
            _top_k: usize,
        ) -> Result<Vec<QaRecord>, RetrievalError> {
            Err(RetrievalError::Embedding("no records to search".to_string()))
        }
    }

    #[tokio::test]
    async fn empty_dataset_skips_retrieval() {
        let provider = Arc::new(ScriptedProvider {
            reply: "No context.".to_string(),
            ..Default::default()
        });
        let qa = QaService::new(
            Arc::new(UnreachableRetriever),
            provider.clone(),
            "sys".to_string(),
            3,
            Duration::from_secs(1),
        );

        assert_eq!(qa.answer("relays?").await.unwrap(), "No context.");
        let prompt = provider.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.contains("Q: "));
    }

    #[tokio::test]
    async fn slow_upstream_times_out_and_service_recovers() {
        let slow = Arc::new(ScriptedProvider {
            reply: "late".to_string(),
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });
        let qa = service(slow, Duration::from_millis(50));
        let err = qa.answer("relays?").await.unwrap_err();
        assert!(matches!(err, QaError::UpstreamUnavailable(ref m) if m.contains("timed out")));

        let fast = Arc::new(ScriptedProvider {
            reply: "ok".to_string(),
            ..Default::default()
        });
        let qa = service(fast, Duration::from_millis(50));
        assert_eq!(qa.answer("relays?").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn blank_upstream_output_is_an_error() {
        let provider = Arc::new(ScriptedProvider {
            reply: " \n ".to_string(),
            ..Default::default()
        });
        let qa = service(provider, Duration::from_secs(1));
        let err = qa.answer("relays?").await.unwrap_err();
        assert_eq!(err.to_string(), "empty output");
    }

    #[test]
    fn errors_map_to_http_errors() {
        assert!(matches!(
            ApiError::from(QaError::EmptyQuestion),
            ApiError::BadRequest(ref m) if m == "question must not be empty"
        ));
        assert!(matches!(
            ApiError::from(QaError::UpstreamUnavailable("timed out".into())),
            ApiError::UpstreamUnavailable(_)
        ));
    }
}
