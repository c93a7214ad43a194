// =============================================================================
// GOOGLE DOCS CLIENT
// =============================================================================
//
// Writes the digest into a new Google Doc:
// 1. `POST /v1/documents` with the title creates an empty document.
// 2. `POST /v1/documents/{id}:batchUpdate` applies every compiled edit in a
//    single ordered request list.
//
// The edit wire format lives here so the compiler stays free of API types.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::auth::GoogleAuth;
use crate::core::docs::{DocumentError, DocumentStore, EditOperation, StyleDirective};

const DEFAULT_BASE_URL: &str = "https://docs.googleapis.com";

// =============================================================================
// BATCH UPDATE WIRE FORMAT
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest {
    requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Request {
    InsertText(InsertTextRequest),
    UpdateTextStyle(UpdateTextStyleRequest),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertTextRequest {
    location: Location,
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTextStyleRequest {
    range: Range,
    text_style: TextStyle,
    fields: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Range {
    start_index: usize,
    end_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextStyle {
    bold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_size: Option<Dimension>,
}

#[derive(Debug, Serialize)]
struct Dimension {
    magnitude: u32,
    unit: &'static str,
}

impl From<&EditOperation> for Request {
    fn from(operation: &EditOperation) -> Self {
        match operation {
            EditOperation::InsertText { index, text } => Request::InsertText(InsertTextRequest {
                location: Location { index: *index },
                text: text.clone(),
            }),
            EditOperation::ApplyStyle {
                start_index,
                end_index,
                style,
            } => Request::UpdateTextStyle(UpdateTextStyleRequest {
                range: Range {
                    start_index: *start_index,
                    end_index: *end_index,
                },
                text_style: text_style(style),
                fields: style_fields(style),
            }),
        }
    }
}

fn text_style(style: &StyleDirective) -> TextStyle {
    TextStyle {
        bold: style.bold,
        font_size: style.font_size_pt.map(|magnitude| Dimension {
            magnitude,
            unit: "PT",
        }),
    }
}

/// The field mask names exactly the style members being set.
fn style_fields(style: &StyleDirective) -> String {
    if style.font_size_pt.is_some() {
        "bold,fontSize".to_string()
    } else {
        "bold".to_string()
    }
}

fn batch_update_body(operations: &[EditOperation]) -> BatchUpdateRequest {
    BatchUpdateRequest {
        requests: operations.iter().map(Request::from).collect(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleDocsClient {
    client: Client,
    auth: Arc<GoogleAuth>,
    base_url: String,
}

impl GoogleDocsClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn bearer(&self) -> Result<String, DocumentError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| DocumentError::Auth(e.to_string()))?;
        Ok(format!("Bearer {}", token))
    }
}

#[async_trait]
impl DocumentStore for GoogleDocsClient {
    async fn create_document(&self, title: &str) -> Result<String, DocumentError> {
        let url = format!("{}/v1/documents", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .map_err(|e| DocumentError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DocumentError::Api(format!(
                "Failed to create document ({}): {}",
                status, text
            )));
        }

        let created: CreatedDocument = response
            .json()
            .await
            .map_err(|e| DocumentError::Api(e.to_string()))?;
        Ok(created.document_id)
    }

    async fn apply_edits(
        &self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), DocumentError> {
        let url = format!("{}/v1/documents/{}:batchUpdate", self.base_url, document_id);

        tracing::debug!(
            "Submitting {} edit request(s) to document {}",
            operations.len(),
            document_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&batch_update_body(operations))
            .send()
            .await
            .map_err(|e| DocumentError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DocumentError::Api(format!(
                "Batch update failed ({}): {}",
                status, text
            )));
        }

        Ok(())
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("https://docs.google.com/document/d/{}/edit", document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::docs::compile_markdown;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::test_support::cached_auth;

    #[test]
    fn test_batch_body_wire_format() {
        let compiled = compile_markdown("# Title\nHello\n");
        let body = serde_json::to_value(batch_update_body(&compiled.operations)).unwrap();

        assert_eq!(
            body,
            json!({
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": "Title\n" } },
                    { "updateTextStyle": {
                        "range": { "startIndex": 1, "endIndex": 6 },
                        "textStyle": { "bold": true, "fontSize": { "magnitude": 16, "unit": "PT" } },
                        "fields": "bold,fontSize"
                    } },
                    { "insertText": { "location": { "index": 7 }, "text": "Hello\n" } }
                ]
            })
        );
    }

    #[test]
    fn test_bold_only_style_field_mask() {
        let style = StyleDirective {
            bold: true,
            font_size_pt: None,
        };
        let value = serde_json::to_value(text_style(&style)).unwrap();

        assert_eq!(value, json!({ "bold": true }));
        assert_eq!(style_fields(&style), "bold");
    }

    #[tokio::test]
    async fn test_create_document_and_apply_edits() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v1/documents"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(json!({ "title": "activity for 2025-02-05" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documentId": "doc-42",
                "title": "activity for 2025-02-05",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let compiled = compile_markdown("## Heading\nbody");
        Mock::given(method("POST"))
            .and(path("/v1/documents/doc-42:batchUpdate"))
            .and(body_json(
                serde_json::to_value(batch_update_body(&compiled.operations)).unwrap(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documentId": "doc-42",
                "replies": [],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleDocsClient::new(cached_auth(&dir)).with_base_url(server.uri());

        let id = client
            .create_document("activity for 2025-02-05")
            .await
            .unwrap();
        assert_eq!(id, "doc-42");
        client.apply_edits(&id, &compiled.operations).await.unwrap();
        assert_eq!(
            client.document_url(&id),
            "https://docs.google.com/document/d/doc-42/edit"
        );
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/v1/documents"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let client = GoogleDocsClient::new(cached_auth(&dir)).with_base_url(server.uri());

        let err = client.create_document("x").await.unwrap_err();
        assert!(matches!(err, DocumentError::Api(ref msg) if msg.contains("PERMISSION_DENIED")));
    }
}
