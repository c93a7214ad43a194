// =============================================================================
// GOOGLE WORKSPACE MODULE
// =============================================================================
//
// HTTP clients for the Google APIs the digest talks to. All of them share one
// `GoogleAuth`, so a single access token (with the documents, gmail.readonly
// and calendar.readonly scopes) serves every call in a run.
//
// - `auth.rs`: credential loading and the access-token cache
// - `docs_client.rs`: creates the report document (`DocumentStore`)
// - `gmail_client.rs`: recent messages (`MailSource`)
// - `calendar_client.rs`: upcoming events (`CalendarSource`)

pub mod auth;
pub mod calendar_client;
pub mod docs_client;
pub mod gmail_client;

pub use auth::GoogleAuth;
pub use calendar_client::GoogleCalendarClient;
pub use docs_client::GoogleDocsClient;
pub use gmail_client::GmailClient;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use super::auth::{CachedToken, GoogleAuth};

    /// Authenticator backed by a pre-seeded token cache, so no exchange happens.
    /// Requests carry `Authorization: Bearer test-token`.
    pub fn cached_auth(dir: &TempDir) -> Arc<GoogleAuth> {
        let cache_path = dir.path().join("token.json");
        let credentials = serde_json::json!({
            "type": "authorized_user",
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh",
            "token_uri": "http://127.0.0.1:9/token",
        });
        let auth = GoogleAuth::from_json(&credentials.to_string())
            .unwrap()
            .with_token_cache(&cache_path);

        let token = CachedToken {
            access_token: "test-token".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            identity: auth.identity(),
        };
        std::fs::write(&cache_path, serde_json::to_string(&token).unwrap()).unwrap();

        Arc::new(auth)
    }
}
