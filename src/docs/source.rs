//! Where scraped documents come from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::record::SourceDocument;

/// A single document could not be retrieved. The scraper skips it and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {id} failed: {message}")]
    Unreachable { id: String, message: String },
    #[error("{id} returned HTTP {status}")]
    Status { id: String, status: u16 },
    #[error("{id} is not a markdown document ({reason})")]
    NotADocument { id: String, reason: String },
    #[error("failed to read {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Identifiers in scrape order.
    fn ids(&self) -> &[String];

    async fn fetch(&self, id: &str) -> Result<SourceDocument, FetchError>;
}

/// Fetches raw markdown over HTTP(S).
pub struct HttpSource {
    urls: Vec<String>,
    client: Client,
}

impl HttpSource {
    pub fn new(urls: Vec<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nips-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { urls, client })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn ids(&self) -> &[String] {
        &self.urls
    }

    async fn fetch(&self, id: &str) -> Result<SourceDocument, FetchError> {
        let unreachable = |e: reqwest::Error| FetchError::Unreachable {
            id: id.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(id).send().await.map_err(unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        if let Some(content_type) = content_type {
            if !content_type.starts_with("text/") || content_type.starts_with("text/html") {
                return Err(FetchError::NotADocument {
                    id: id.to_string(),
                    reason: format!("content type {}", content_type),
                });
            }
        }

        let text = response.text().await.map_err(unreachable)?;
        into_document(id, text)
    }
}

/// Reads `*.md` files from a local directory, sorted by file name.
pub struct DirSource {
    paths: Vec<String>,
}

impl DirSource {
    pub fn new(dir: &Path) -> Result<Self, FetchError> {
        let io_err = |source| FetchError::Io {
            id: dir.display().to_string(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.eq_ignore_ascii_case("md"))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        Ok(Self {
            paths: paths
                .into_iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
        })
    }
}

#[async_trait]
impl DocumentSource for DirSource {
    fn ids(&self) -> &[String] {
        &self.paths
    }

    async fn fetch(&self, id: &str) -> Result<SourceDocument, FetchError> {
        let text = tokio::fs::read_to_string(id)
            .await
            .map_err(|source| FetchError::Io {
                id: id.to_string(),
                source,
            })?;
        into_document(id, text)
    }
}

/// In-memory documents, mainly for tests and offline runs.
pub struct StaticSource {
    ids: Vec<String>,
    docs: Vec<(String, String)>,
}

impl StaticSource {
    pub fn new<I, S, T>(docs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let docs: Vec<(String, String)> = docs
            .into_iter()
            .map(|(id, text)| (id.into(), text.into()))
            .collect();
        Self {
            ids: docs.iter().map(|(id, _)| id.clone()).collect(),
            docs,
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn ids(&self) -> &[String] {
        &self.ids
    }

    async fn fetch(&self, id: &str) -> Result<SourceDocument, FetchError> {
        let text = self
            .docs
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| FetchError::Unreachable {
                id: id.to_string(),
                message: "unknown document".to_string(),
            })?;
        into_document(id, text)
    }
}

fn into_document(id: &str, text: String) -> Result<SourceDocument, FetchError> {
    if text.trim().is_empty() {
        return Err(FetchError::NotADocument {
            id: id.to_string(),
            reason: "empty body".to_string(),
        });
    }
    let head = text.trim_start().get(..64).unwrap_or(text.trim_start());
    let head = head.to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err(FetchError::NotADocument {
            id: id.to_string(),
            reason: "HTML page".to_string(),
        });
    }
    Ok(SourceDocument {
        id: id.to_string(),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dir_source_reads_markdown_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02.md"), "# Two\n\nsecond").unwrap();
        std::fs::write(dir.path().join("01.md"), "# One\n\nfirst").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirSource::new(dir.path()).unwrap();
        assert_eq!(source.ids().len(), 2);
        assert!(source.ids()[0].ends_with("01.md"));

        let doc = source.fetch(&source.ids()[1]).await.unwrap();
        assert!(doc.text.contains("second"));
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let source = StaticSource::new(Vec::<(String, String)>::new());
        let err = source.fetch("nope.md").await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }

    #[test]
    fn html_and_empty_bodies_are_rejected() {
        assert!(matches!(
            into_document("x", "<!DOCTYPE html><html></html>".to_string()),
            Err(FetchError::NotADocument { .. })
        ));
        assert!(matches!(
            into_document("x", "  \n".to_string()),
            Err(FetchError::NotADocument { .. })
        ));
        assert!(into_document("x", "# NIP-01".to_string()).is_ok());
    }
}
