use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::core::tasks::{TaskError, TaskTracker};

const DEFAULT_BASE_URL: &str = "https://api.todoist.com";

/// Creates tasks through the Todoist REST v2 API.
pub struct TodoistClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct NewTask<'a> {
    content: &'a str,
    due_string: &'a str,
    due_date: String,
}

impl TodoistClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TaskTracker for TodoistClient {
    async fn create_task(&self, content: &str, due_date: NaiveDate) -> Result<(), TaskError> {
        let url = format!("{}/rest/v2/tasks", self.base_url);
        let task = NewTask {
            content,
            due_string: "today",
            due_date: due_date.format("%Y-%m-%d").to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&task)
            .send()
            .await
            .map_err(|e| TaskError::Api(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(TaskError::Api(format!("Todoist returned {}: {}", status, body)))
            }
        }
    }
}
