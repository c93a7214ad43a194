use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use crate::core::news::{ArticleFetcher, NewsError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// How much of an article's body ends up in the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnippetMode {
    /// Only the first non-empty paragraph.
    First,
    /// Every non-empty paragraph, joined with spaces.
    #[default]
    All,
}

impl std::str::FromStr for SnippetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(SnippetMode::First),
            "all" => Ok(SnippetMode::All),
            other => Err(format!("unknown snippet mode '{}', expected 'first' or 'all'", other)),
        }
    }
}

/// Downloads article pages and extracts their `<p>` text.
pub struct HttpArticleFetcher {
    client: Client,
    mode: SnippetMode,
}

impl HttpArticleFetcher {
    pub fn new(user_agent: &str, mode: SnippetMode) -> Result<Self, NewsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_str(user_agent).map_err(|e| NewsError::Api(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| NewsError::Api(e.to_string()))?;

        Ok(Self { client, mode })
    }
}

/// Extracts paragraph text from an HTML page.
pub fn extract_paragraphs(html: &str, mode: SnippetMode) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    let mut paragraphs = document
        .select(&selector)
        .map(|p| {
            p.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty());

    match mode {
        SnippetMode::First => paragraphs.next().unwrap_or_default(),
        SnippetMode::All => paragraphs.collect::<Vec<_>>().join(" "),
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_snippet(&self, url: &str) -> Result<String, NewsError> {
        let fetch_error = |reason: String| NewsError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(fetch_error(format!(
                "returned status code {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        Ok(extract_paragraphs(&body, self.mode))
    }
}
