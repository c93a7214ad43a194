use async_trait::async_trait;
use thiserror::Error;

/// Errors from the news source or while fetching an article.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("News API error: {0}")]
    Api(String),
    #[error("Failed to fetch article {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// A headline as returned by the news source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub url: String,
}

/// Source of ranked headlines.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Returns at most `limit` top headlines, optionally filtered by `query`.
    async fn top_headlines(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Article>, NewsError>;
}

/// Pulls readable body text out of an article page.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Returns the article's paragraph text, or an empty string if there is none.
    async fn fetch_snippet(&self, url: &str) -> Result<String, NewsError>;
}

/// Builds the Markdown block for one news section.
///
/// A snippet that cannot be fetched is logged and left out; the headline and
/// link are still listed.
pub async fn compile_news_section(
    articles: &[Article],
    section_title: &str,
    fetcher: &dyn ArticleFetcher,
) -> String {
    let mut section = format!("### {}\n\n", section_title);

    for article in articles {
        let snippet = if article.url.is_empty() {
            String::new()
        } else {
            match fetcher.fetch_snippet(&article.url).await {
                Ok(snippet) => snippet,
                Err(e) => {
                    tracing::warn!("Error fetching snippet: {}", e);
                    String::new()
                }
            }
        };

        section.push_str(&format!("**{}**\n\n", article.title));
        if !snippet.is_empty() {
            section.push_str(&format!("Snippet: {}\n\n", snippet));
        }
        section.push_str(&format!("Link: {}\n\n", article.url));
    }

    section
}

/// Fetches headlines and compiles them into a section, degrading to a header-only
/// section when the news source is unavailable.
pub async fn gather_news_section(
    source: &dyn NewsSource,
    fetcher: &dyn ArticleFetcher,
    query: Option<&str>,
    limit: usize,
    section_title: &str,
) -> String {
    let articles = match source.top_headlines(query, limit).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!("Error fetching news for '{}': {}", section_title, e);
            Vec::new()
        }
    };

    tracing::info!(
        "Fetched {} article(s) for '{}'",
        articles.len(),
        section_title
    );
    compile_news_section(&articles, section_title, fetcher).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapFetcher {
        snippets: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn new(entries: &[(&str, Result<&str, &str>)]) -> Self {
            Self {
                snippets: entries
                    .iter()
                    .map(|(url, r)| {
                        (
                            url.to_string(),
                            r.map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ArticleFetcher for MapFetcher {
        async fn fetch_snippet(&self, url: &str) -> Result<String, NewsError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.snippets.get(url) {
                Some(Ok(s)) => Ok(s.clone()),
                Some(Err(reason)) => Err(NewsError::Fetch {
                    url: url.to_string(),
                    reason: reason.clone(),
                }),
                None => Ok(String::new()),
            }
        }
    }

    struct FailingSource;

    #[async_trait]
    impl NewsSource for FailingSource {
        async fn top_headlines(
            &self,
            _query: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<Article>, NewsError> {
            Err(NewsError::Api("apiKeyInvalid".to_string()))
        }
    }

    fn article(title: &str, url: &str) -> Article {
        Article {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_section_layout() {
        let fetcher = MapFetcher::new(&[
            ("https://a.example", Ok("First paragraph.")),
            ("https://b.example", Ok("")),
        ]);
        let articles = vec![
            article("Headline A", "https://a.example"),
            article("Headline B", "https://b.example"),
        ];

        let section = compile_news_section(&articles, "Top Stories", &fetcher).await;

        assert_eq!(
            section,
            "### Top Stories\n\n\
             **Headline A**\n\nSnippet: First paragraph.\n\nLink: https://a.example\n\n\
             **Headline B**\n\nLink: https://b.example\n\n"
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_omits_snippet() {
        let fetcher = MapFetcher::new(&[("https://a.example", Err("timed out"))]);
        let articles = vec![article("Headline A", "https://a.example")];

        let section = compile_news_section(&articles, "Top Stories", &fetcher).await;

        assert!(!section.contains("Snippet:"));
        assert!(section.contains("Link: https://a.example"));
    }

    #[tokio::test]
    async fn test_empty_url_is_not_fetched() {
        let fetcher = MapFetcher::new(&[]);
        let articles = vec![article("No Link", "")];

        let section = compile_news_section(&articles, "Top Stories", &fetcher).await;

        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert!(section.ends_with("Link: \n\n"));
    }

    #[tokio::test]
    async fn test_unavailable_source_gives_header_only() {
        let fetcher = MapFetcher::new(&[]);

        let section = gather_news_section(&FailingSource, &fetcher, None, 20, "Top Stories").await;

        assert_eq!(section, "### Top Stories\n\n");
    }
}
