//! Resolves the document URL list from a private GitHub repository.
//!
//! The repository holds a file with a `NIPS_URLS = [ ... ]` list, one quoted
//! URL per line.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::core::config::GitHubSourceConfig;

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum UrlListError {
    #[error("failed to fetch {path} from GitHub: {message}")]
    Request { path: String, message: String },
    #[error("failed to fetch {path} from GitHub: HTTP {status} {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("no URLs found in NIPS_URLS list")]
    Empty,
}

pub struct GitHubUrlListFetcher {
    config: GitHubSourceConfig,
    token: String,
    api_base: String,
    client: Client,
}

impl GitHubUrlListFetcher {
    pub fn new(
        config: GitHubSourceConfig,
        token: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nips-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            token,
            api_base: GITHUB_API.to_string(),
            client,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn fetch_urls(&self) -> Result<Vec<String>, UrlListError> {
        tracing::info!(
            "Fetching NIPS_URLS from {}/{}:{}",
            self.config.owner,
            self.config.repo,
            self.config.path
        );
        let content = self.fetch_file_content().await?;
        let urls = parse_nips_urls(&content)?;
        tracing::info!("Fetched {} URLs.", urls.len());
        Ok(urls)
    }

    async fn fetch_file_content(&self) -> Result<String, UrlListError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, self.config.owner, self.config.repo, self.config.path
        );
        let request_err = |e: reqwest::Error| UrlListError::Request {
            path: self.config.path.clone(),
            message: e.to_string(),
        };

        let request = match &self.config.username {
            Some(username) => self
                .client
                .get(&url)
                .basic_auth(username, Some(&self.token)),
            None => self.client.get(&url).bearer_auth(&self.token),
        };
        let response = request
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw")
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UrlListError::Status {
                path: self.config.path.clone(),
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(request_err)
    }
}

/// Extracts the quoted entries of the `NIPS_URLS = [` list.
pub fn parse_nips_urls(file_content: &str) -> Result<Vec<String>, UrlListError> {
    let mut urls = Vec::new();
    let mut inside_list = false;

    for line in file_content.lines() {
        let line = line.trim();
        if !inside_list {
            if line.starts_with("NIPS_URLS") && line.contains('=') {
                inside_list = true;
            }
            continue;
        }

        if line.starts_with(']') {
            break;
        }
        if line.starts_with('"') || line.starts_with('\'') {
            let url = line
                .trim_end_matches(',')
                .trim_matches(|c| c == '"' || c == '\'');
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
    }

    if urls.is_empty() {
        return Err(UrlListError::Empty);
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_urls_until_closing_bracket() {
        let content = r#"
# generated
NIPS_URLS = [
    "https://raw.githubusercontent.com/nostr-protocol/nips/master/01.md",
    'https://raw.githubusercontent.com/nostr-protocol/nips/master/02.md',
    # comment lines are ignored
]
OTHER = ["https://example.com/ignored.md"]
"#;
        let urls = parse_nips_urls(content).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://raw.githubusercontent.com/nostr-protocol/nips/master/01.md",
                "https://raw.githubusercontent.com/nostr-protocol/nips/master/02.md",
            ]
        );
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(
            parse_nips_urls("NIPS_URLS = [\n]\n"),
            Err(UrlListError::Empty)
        ));
        assert!(matches!(parse_nips_urls(""), Err(UrlListError::Empty)));
    }
}
