use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::auth::GoogleAuth;
use crate::core::workspace::{CalendarEvent, CalendarSource, WorkspaceError};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Lists events on the user's primary calendar through the Calendar v3 API.
pub struct GoogleCalendarClient {
    client: Client,
    auth: Arc<GoogleAuth>,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            calendar_id: "primary".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn map_event(api: ApiEvent) -> CalendarEvent {
        let start = api
            .start
            .and_then(|s| s.date_time.or(s.date))
            .unwrap_or_default();

        CalendarEvent {
            summary: api.summary.unwrap_or_else(|| "No Title".to_string()),
            start,
        }
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, WorkspaceError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| WorkspaceError::Auth(e.to_string()))?;

        let url = format!(
            "{}/calendar/v3/calendars/{}/events",
            self.base_url, self.calendar_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("timeMin", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("timeMax", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WorkspaceError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WorkspaceError::Api(format!(
                "Calendar returned {}: {}",
                status, text
            )));
        }

        let events: ApiEventList = response
            .json()
            .await
            .map_err(|e| WorkspaceError::Api(e.to_string()))?;

        Ok(events.items.into_iter().map(Self::map_event).collect())
    }
}

#[derive(Debug, Deserialize)]
struct ApiEventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    summary: Option<String>,
    start: Option<ApiEventTime>,
}

/// Timed events carry `dateTime`, all-day events only `date`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::test_support::cached_auth;

    #[tokio::test]
    async fn test_events_between() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("timeMin", "2025-02-05T08:00:00Z"))
            .and(query_param("timeMax", "2025-02-06T08:00:00Z"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "summary": "Standup", "start": { "dateTime": "2025-02-05T09:30:00Z" } },
                    { "summary": "Holiday", "start": { "date": "2025-02-06" } },
                    { "start": { "dateTime": "2025-02-05T15:00:00Z" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new(cached_auth(&dir)).with_base_url(server.uri());
        let from = Utc.with_ymd_and_hms(2025, 2, 5, 8, 0, 0).unwrap();
        let events = client
            .events_between(from, from + chrono::Duration::days(1))
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![
                CalendarEvent {
                    summary: "Standup".to_string(),
                    start: "2025-02-05T09:30:00Z".to_string(),
                },
                CalendarEvent {
                    summary: "Holiday".to_string(),
                    start: "2025-02-06".to_string(),
                },
                CalendarEvent {
                    summary: "No Title".to_string(),
                    start: "2025-02-05T15:00:00Z".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("UNAUTHENTICATED"))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new(cached_auth(&dir)).with_base_url(server.uri());
        let now = Utc::now();
        let err = client
            .events_between(now, now + chrono::Duration::days(1))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkspaceError::Api(ref msg) if msg.contains("401")));
    }
}
