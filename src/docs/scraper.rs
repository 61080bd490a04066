use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;

use super::markdown::segment;
use super::record::{Dataset, QaRecord, SourceDocument};
use super::source::{DocumentSource, FetchError};

/// Records extracted from one document plus what was dropped on the way.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub records: Vec<QaRecord>,
    pub short_headings: usize,
    pub empty_sections: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub documents_fetched: usize,
    pub documents_failed: usize,
    pub short_headings: usize,
    pub empty_sections: usize,
    pub records: usize,
}

/// Turns a document into records: one per section whose heading is at least
/// `min_heading_length` characters and whose body is non-empty.
pub fn extract_records(doc: &SourceDocument, min_heading_length: usize) -> Extracted {
    let mut extracted = Extracted::default();

    for section in segment(&doc.text) {
        if section.heading_len() < min_heading_length {
            extracted.short_headings += 1;
            continue;
        }
        match QaRecord::from_section(&section) {
            Some(record) => extracted.records.push(record),
            None => extracted.empty_sections += 1,
        }
    }

    extracted
}

pub struct Scraper {
    source: Arc<dyn DocumentSource>,
    min_heading_length: usize,
    concurrency: usize,
}

impl Scraper {
    pub fn new(source: Arc<dyn DocumentSource>, min_heading_length: usize) -> Self {
        Self {
            source,
            min_heading_length,
            concurrency: 1,
        }
    }

    /// Fetches up to `concurrency` documents at once; output order is still
    /// the source order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn outcomes(&self) -> impl Stream<Item = (String, Result<Extracted, FetchError>)> + '_ {
        let min_heading_length = self.min_heading_length;
        stream::iter(self.source.ids().iter().cloned())
            .map(move |id| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source
                        .fetch(&id)
                        .await
                        .map(|doc| extract_records(&doc, min_heading_length));
                    (id, result)
                }
            })
            .buffered(self.concurrency)
    }

    /// Lazy record stream. Each call starts a fresh pass over the sources;
    /// documents that fail to fetch are logged and skipped.
    pub fn records(&self) -> impl Stream<Item = QaRecord> + '_ {
        self.outcomes().flat_map(|(id, result)| {
            let records = match result {
                Ok(extracted) => extracted.records,
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", id, err);
                    Vec::new()
                }
            };
            stream::iter(records)
        })
    }

    /// Runs a full pass and collects the dataset with a summary.
    pub async fn scrape(&self) -> (Dataset, ScrapeReport) {
        let mut dataset = Dataset::new();
        let mut report = ScrapeReport {
            started_at: Utc::now(),
            ..ScrapeReport::default()
        };
        let total = self.source.ids().len();

        tracing::info!("Scraping {} NIPS documents...", total);
        let mut outcomes = Box::pin(self.outcomes());
        let mut processed = 0usize;
        while let Some((id, result)) = outcomes.next().await {
            processed += 1;
            match result {
                Ok(extracted) => {
                    report.documents_fetched += 1;
                    report.short_headings += extracted.short_headings;
                    report.empty_sections += extracted.empty_sections;
                    tracing::debug!(
                        "[{}/{}] {}: {} records",
                        processed,
                        total,
                        id,
                        extracted.records.len()
                    );
                    dataset.extend(extracted.records);
                }
                Err(err) => {
                    report.documents_failed += 1;
                    tracing::warn!("[{}/{}] Skipping {}: {}", processed, total, id, err);
                }
            }
        }
        report.records = dataset.len();
        report.finished_at = Utc::now();

        tracing::info!(
            "Scraping complete: {} records from {} documents ({} failed). Skipped {} empty sections, {} short headings.",
            report.records,
            report.documents_fetched,
            report.documents_failed,
            report.empty_sections,
            report.short_headings
        );
        (dataset, report)
    }
}
