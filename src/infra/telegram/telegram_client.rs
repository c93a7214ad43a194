use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::notify::{ChatNotifier, NotifyError};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Sends digest updates through the Telegram Bot API.
///
/// Without a configured chat id, the chat of the most recent message the bot
/// received is used.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: Option<String>,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            chat_id,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    async fn resolve_chat_id(&self) -> Result<String, NotifyError> {
        if let Some(chat_id) = &self.chat_id {
            return Ok(chat_id.clone());
        }

        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .send()
            .await
            .map_err(|e| NotifyError::Api(e.to_string()))?;

        let updates: ApiResponse<Vec<ApiUpdate>> = response
            .json()
            .await
            .map_err(|e| NotifyError::Api(e.to_string()))?;

        if !updates.ok {
            return Err(NotifyError::Api(
                updates.description.unwrap_or_else(|| "getUpdates failed".to_string()),
            ));
        }

        updates
            .result
            .unwrap_or_default()
            .into_iter()
            .rev()
            .find_map(|update| update.message.map(|m| m.chat.id.to_string()))
            .ok_or_else(|| {
                NotifyError::NotConfigured(
                    "no chat id configured and the bot has no recent messages".to_string(),
                )
            })
    }
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let chat_id = self.resolve_chat_id().await?;

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api(format!(
                "sendMessage returned {}: {}",
                status, body
            )));
        }

        tracing::info!("Telegram message sent to chat {}", chat_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    chat: ApiChat,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_to_configured_chat() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(json!({ "chat_id": "42", "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/botTOKEN/getUpdates"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("TOKEN".to_string(), Some("42".to_string()))
            .with_base_url(server.uri());
        notifier.send_message("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_chat_id_from_latest_update() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/botTOKEN/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    { "update_id": 1, "message": { "message_id": 1, "chat": { "id": 100 } } },
                    { "update_id": 2, "message": { "message_id": 2, "chat": { "id": 200 } } },
                    { "update_id": 3, "edited_message": { "message_id": 2, "chat": { "id": 300 } } }
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(json!({ "chat_id": "200", "text": "digest" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("TOKEN".to_string(), None).with_base_url(server.uri());
        notifier.send_message("digest").await.unwrap();
    }

    #[tokio::test]
    async fn test_no_updates_is_not_configured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/botTOKEN/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": [] })))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("TOKEN".to_string(), None).with_base_url(server.uri());
        let err = notifier.send_message("digest").await.unwrap_err();

        assert!(matches!(err, NotifyError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_send_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request: chat not found"))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("TOKEN".to_string(), Some("1".to_string()))
            .with_base_url(server.uri());
        let err = notifier.send_message("x").await.unwrap_err();

        assert!(matches!(err, NotifyError::Api(ref msg) if msg.contains("chat not found")));
    }
}
