// =============================================================================
// GOOGLE OAUTH2 ACCESS TOKENS
// =============================================================================
//
// Loads a standard Google credential file and turns it into short-lived access
// tokens for the Docs, Gmail and Calendar APIs.
//
// **Supported credential types** (the `type` field of the JSON):
// - `service_account`: signs a JWT and exchanges it at `token_uri`. Reading a
//   user's mail or calendar requires domain-wide delegation; set
//   `GOOGLE_DELEGATED_USER` to the mailbox to impersonate.
// - `authorized_user`: exchanges a stored refresh token at `token_uri`. This is
//   what `gcloud auth application-default login` writes.
//
// Tokens are cached in memory and in a JSON file so consecutive runs reuse
// them until they are about to expire. There is no browser consent flow; if
// the refresh token is revoked, the credential file has to be regenerated.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

pub const DOCUMENTS_SCOPE: &str = "https://www.googleapis.com/auth/documents";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid Google credentials: {0}")]
    Credentials(String),
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
    #[error("Token cache error: {0}")]
    Cache(String),
}

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// User credentials holding a long-lived refresh token.
#[derive(Debug, Clone, Deserialize)]
struct AuthorizedUserCredentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GoogleCredentials {
    ServiceAccount(ServiceAccountCredentials),
    AuthorizedUser(AuthorizedUserCredentials),
}

/// JWT claims for the service account grant.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Access token as kept in memory and in the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Credential, subject and scopes the token was issued for.
    #[serde(default)]
    pub identity: String,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Hands out valid access tokens, refreshing them when needed.
pub struct GoogleAuth {
    credentials: GoogleCredentials,
    scopes: Vec<String>,
    subject: Option<String>,
    cache_path: Option<PathBuf>,
    client: Client,
    cached_token: RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Creates an authenticator from the credential file at `path`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AuthError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Creates an authenticator from credential JSON content.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let credentials: GoogleCredentials = serde_json::from_str(json).map_err(|e| {
            AuthError::Credentials(format!(
                "expected a `service_account` or `authorized_user` credential file: {}",
                e
            ))
        })?;

        Ok(Self {
            credentials,
            scopes: vec![
                DOCUMENTS_SCOPE.to_string(),
                GMAIL_READONLY_SCOPE.to_string(),
                CALENDAR_READONLY_SCOPE.to_string(),
            ],
            subject: None,
            cache_path: None,
            client: Client::new(),
            cached_token: RwLock::new(None),
        })
    }

    /// Impersonates `subject` (service accounts with domain-wide delegation only).
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    /// Persists tokens to `path` and reuses them across runs.
    pub fn with_token_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Key for the principal a token belongs to. A cached token is only reused
    /// by an authenticator with the same key.
    pub(crate) fn identity(&self) -> String {
        let principal = match &self.credentials {
            GoogleCredentials::ServiceAccount(sa) => format!("service_account:{}", sa.client_email),
            GoogleCredentials::AuthorizedUser(user) => {
                format!("authorized_user:{}", user.client_id)
            }
        };
        format!(
            "{}|{}|{}",
            principal,
            self.subject.as_deref().unwrap_or(""),
            self.scopes.join(" ")
        )
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();

        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
                return Ok(token.access_token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        if let Some(token) = self.load_cache().await.filter(|t| t.is_fresh(now)) {
            tracing::debug!("Reusing cached Google access token");
            let access_token = token.access_token.clone();
            *cached = Some(token);
            return Ok(access_token);
        }

        let token = self.fetch_new_token(now).await?;
        self.store_cache(&token).await;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn fetch_new_token(&self, now: DateTime<Utc>) -> Result<CachedToken, AuthError> {
        let (token_uri, form) = match &self.credentials {
            GoogleCredentials::ServiceAccount(sa) => {
                let claims = JwtClaims {
                    iss: sa.client_email.clone(),
                    scope: self.scopes.join(" "),
                    aud: sa.token_uri.clone(),
                    iat: now.timestamp(),
                    exp: now.timestamp() + 3600,
                    sub: self.subject.clone(),
                };

                let key = EncodingKey::from_rsa_pem(sa.private_key.as_bytes())
                    .map_err(|e| AuthError::Credentials(e.to_string()))?;
                let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
                    .map_err(|e| AuthError::Credentials(e.to_string()))?;

                (
                    sa.token_uri.as_str(),
                    vec![
                        (
                            "grant_type",
                            "urn:ietf:params:oauth:grant-type:jwt-bearer".to_string(),
                        ),
                        ("assertion", jwt),
                    ],
                )
            }
            GoogleCredentials::AuthorizedUser(user) => (
                user.token_uri.as_str(),
                vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("client_id", user.client_id.clone()),
                    ("client_secret", user.client_secret.clone()),
                    ("refresh_token", user.refresh_token.clone()),
                ],
            ),
        };

        tracing::debug!("Requesting new Google access token from {}", token_uri);

        let response = self
            .client
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!("{} - {}", status, text)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
            identity: self.identity(),
        })
    }

    async fn load_cache(&self) -> Option<CachedToken> {
        let path = self.cache_path.as_ref()?;
        let text = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str::<CachedToken>(&text) {
            Ok(token) if token.identity == self.identity() => Some(token),
            Ok(_) => {
                tracing::info!(
                    "Token cache {} belongs to another identity, fetching a new token",
                    path.display()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable token cache {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn store_cache(&self, token: &CachedToken) {
        let Some(path) = self.cache_path.as_ref() else {
            return;
        };

        if let Err(e) = write_token_cache(path, token).await {
            tracing::warn!("{}", e);
        }
    }
}

async fn write_token_cache(path: &Path, token: &CachedToken) -> Result<(), AuthError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AuthError::Cache(e.to_string()))?;
    }

    let text = serde_json::to_string_pretty(token).map_err(|e| AuthError::Cache(e.to_string()))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| AuthError::Cache(format!("cannot write {}: {}", path.display(), e)))
}
