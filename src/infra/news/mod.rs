// News infra layer.
// - `newsapi_client.rs` queries NewsAPI top headlines (`NewsSource`).
// - `article_fetcher.rs` downloads article pages and scrapes paragraphs (`ArticleFetcher`).

#[path = "newsapi_client.rs"]
pub mod newsapi_client;

#[path = "article_fetcher.rs"]
pub mod article_fetcher;

pub use article_fetcher::{HttpArticleFetcher, SnippetMode};
pub use newsapi_client::NewsApiClient;
