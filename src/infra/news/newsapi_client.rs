use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::Deserialize;

use crate::core::news::{Article, NewsError, NewsSource};

const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// Client for NewsAPI's `top-headlines` endpoint (English results only).
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: String, user_agent: &str) -> Result<Self, NewsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_str(user_agent).map_err(|e| NewsError::Api(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| NewsError::Api(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn top_headlines(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Article>, NewsError> {
        let url = format!("{}/v2/top-headlines", self.base_url);

        let mut req = self.client.get(&url).query(&[
            ("apiKey", self.api_key.as_str()),
            ("language", "en"),
            ("pageSize", &limit.to_string()),
        ]);
        if let Some(query) = query {
            req = req.query(&[("q", query)]);
        }

        let resp = req.send().await.map_err(|e| NewsError::Api(e.to_string()))?;

        // NewsAPI reports failures in the body, usually alongside a 4xx status.
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| NewsError::Api(e.to_string()))?;

        if body.status.as_deref() != Some("ok") {
            return Err(NewsError::Api(
                body.message
                    .unwrap_or_else(|| "unknown NewsAPI error".to_string()),
            ));
        }

        Ok(body
            .articles
            .into_iter()
            .map(|a| Article {
                title: a.title.unwrap_or_else(|| "No Title".to_string()),
                url: a.url.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    title: Option<String>,
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UA: &str = "daily_digest/test";

    #[tokio::test]
    async fn test_top_headlines_with_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .and(query_param("apiKey", "key"))
            .and(query_param("language", "en"))
            .and(query_param("pageSize", "20"))
            .and(query_param("q", "climate"))
            .and(header("User-Agent", UA))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 2,
                "articles": [
                    { "title": "Heatwave", "url": "https://news.example/heat" },
                    { "title": null, "url": null }
                ]
            })))
            .mount(&server)
            .await;

        let client = NewsApiClient::new("key".to_string(), UA)
            .unwrap()
            .with_base_url(server.uri());
        let articles = client.top_headlines(Some("climate"), 20).await.unwrap();

        assert_eq!(
            articles,
            vec![
                Article {
                    title: "Heatwave".to_string(),
                    url: "https://news.example/heat".to_string(),
                },
                Article {
                    title: "No Title".to_string(),
                    url: String::new(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_error_status_in_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/top-headlines"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid or incorrect."
            })))
            .mount(&server)
            .await;

        let client = NewsApiClient::new("bad".to_string(), UA)
            .unwrap()
            .with_base_url(server.uri());
        let err = client.top_headlines(None, 5).await.unwrap_err();

        assert!(matches!(err, NewsError::Api(ref msg) if msg.contains("API key is invalid")));
    }
}
