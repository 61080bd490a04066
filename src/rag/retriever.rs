use std::sync::Arc;

use async_trait::async_trait;

use super::vector_math::rank_descending_by_cosine;
use super::RetrievalError;
use crate::docs::{Dataset, QaRecord};
use crate::llm::EmbeddingProvider;

const EMBED_BATCH_SIZE: usize = 64;

/// Selects the records most relevant to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    /// number of records the retriever searches over
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn retrieve(&self, question: &str, top_k: usize)
        -> Result<Vec<QaRecord>, RetrievalError>;
}

#[derive(Debug, Clone)]
struct ScoredRecord<'a> {
    record: &'a QaRecord,
    score: f64,
}

/// Term-overlap scoring over `question + answer`.
pub struct KeywordRetriever {
    records: Dataset,
    // lowercased "question answer" per record
    haystacks: Vec<String>,
}

impl KeywordRetriever {
    pub fn new(records: Dataset) -> Self {
        let haystacks = records
            .iter()
            .map(|r| format!("{} {}", r.question, r.answer).to_lowercase())
            .collect();
        Self { records, haystacks }
    }

    fn rank(&self, question: &str, top_k: usize) -> Vec<QaRecord> {
        let terms = query_terms(question);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredRecord<'_>> = self
            .records
            .iter()
            .zip(&self.haystacks)
            .map(|(record, haystack)| {
                let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                ScoredRecord {
                    record,
                    score: hits as f64 / terms.len() as f64,
                }
            })
            .filter(|sr| sr.score > 0.0)
            .collect();

        // stable sort: ties stay in dataset order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored.into_iter().map(|sr| sr.record.clone()).collect()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        "keyword"
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<QaRecord>, RetrievalError> {
        Ok(self.rank(question, top_k))
    }
}

fn query_terms(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Cosine ranking over record embeddings computed once up front.
pub struct EmbeddingRetriever {
    records: Dataset,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingRetriever {
    pub async fn build(
        records: Dataset,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RetrievalError> {
        let texts: Vec<String> = records
            .iter()
            .map(|r| format!("{}\n{}", r.question, r.answer))
            .collect();

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let vectors = embedder
                .embed(batch)
                .await
                .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
            embeddings.extend(vectors);
        }
        tracing::info!("Embedded {} records for retrieval", embeddings.len());

        Ok(Self {
            records,
            embeddings,
            embedder,
        })
    }
}

#[async_trait]
impl Retriever for EmbeddingRetriever {
    fn name(&self) -> &str {
        "embedding"
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<QaRecord>, RetrievalError> {
        if self.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("no query embedding returned".to_string()))?;

        let ranked = rank_descending_by_cosine(&query, &self.embeddings)?;
        Ok(ranked
            .into_iter()
            .take(top_k)
            .filter_map(|(idx, _)| self.records.get(idx).cloned())
            .collect())
    }
}
