use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::auth::GoogleAuth;
use crate::core::workspace::{EmailMessage, MailSource, WorkspaceError};

const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com";

/// Reads the signed-in user's mailbox through the Gmail v1 API.
pub struct GmailClient {
    client: Client,
    auth: Arc<GoogleAuth>,
    base_url: String,
    max_results: u32,
}

impl GmailClient {
    pub fn new(auth: Arc<GoogleAuth>, max_results: u32) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Gmail search syntax for the window, rounded up to whole days (minimum 1).
    fn newer_than_query(window: chrono::Duration) -> String {
        let hours = window.num_hours().max(1);
        let days = (hours + 23) / 24;
        format!("newer_than:{}d", days)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WorkspaceError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| WorkspaceError::Auth(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| WorkspaceError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WorkspaceError::Api(format!("Gmail returned {}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| WorkspaceError::Api(e.to_string()))
    }

    fn map_message(api: ApiMessage) -> EmailMessage {
        let mut message = EmailMessage {
            snippet: api.snippet.unwrap_or_default(),
            ..EmailMessage::default()
        };

        let headers = api.payload.map(|p| p.headers).unwrap_or_default();
        for header in headers {
            match header.name.to_lowercase().as_str() {
                "subject" => message.subject = header.value,
                "from" => message.from = header.value,
                "date" => message.date = header.value,
                _ => {}
            }
        }

        message
    }
}

#[async_trait]
impl MailSource for GmailClient {
    async fn recent_messages(
        &self,
        window: chrono::Duration,
    ) -> Result<Vec<EmailMessage>, WorkspaceError> {
        let list_url = format!("{}/gmail/v1/users/me/messages", self.base_url);
        let list: ApiMessageList = self
            .get_json(
                &list_url,
                &[
                    ("q", Self::newer_than_query(window)),
                    ("maxResults", self.max_results.to_string()),
                ],
            )
            .await?;

        let mut messages = Vec::with_capacity(list.messages.len());
        for reference in list.messages {
            let url = format!("{}/{}", list_url, reference.id);
            let detail: Result<ApiMessage, _> = self
                .get_json(
                    &url,
                    &[
                        ("format", "metadata".to_string()),
                        ("metadataHeaders", "Subject".to_string()),
                        ("metadataHeaders", "From".to_string()),
                        ("metadataHeaders", "Date".to_string()),
                    ],
                )
                .await;

            match detail {
                Ok(detail) => messages.push(Self::map_message(detail)),
                Err(e) => tracing::warn!("Skipping message {}: {}", reference.id, e),
            }
        }

        Ok(messages)
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessageList {
    #[serde(default)]
    messages: Vec<ApiMessageRef>,
}

#[derive(Debug, Deserialize)]
struct ApiMessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    snippet: Option<String>,
    payload: Option<ApiPayload>,
}

#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(default)]
    headers: Vec<ApiHeader>,
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    name: String,
    value: String,
}
