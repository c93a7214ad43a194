use std::path::PathBuf;

use chrono_tz::Tz;
use thiserror::Error;

use crate::core::ai::AiConfig;
use crate::infra::ai::openai_client::DEFAULT_BASE_URL as DEFAULT_OPENAI_BASE_URL;
use crate::infra::news::SnippetMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the digest reads from the environment.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub newsapi_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub ai: AiConfig,
    pub news_limit: usize,
    pub topics: Vec<String>,
    pub snippet_mode: SnippetMode,
    pub alert_senders: Vec<String>,
    pub mail_max_results: u32,
    pub timezone: Tz,
    pub google_credentials_file: PathBuf,
    pub google_token_cache: PathBuf,
    /// Mailbox to impersonate when the credentials are a service account.
    pub google_delegated_user: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub todoist_api_key: Option<String>,
}

impl DigestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let news_limit = match get("NEWS_LIMIT") {
            Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::Invalid {
                name: "NEWS_LIMIT",
                reason: e.to_string(),
            })?,
            None => 20,
        };

        let mail_max_results = match get("MAIL_MAX_RESULTS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: "MAIL_MAX_RESULTS",
                reason: e.to_string(),
            })?,
            None => 100,
        };

        let snippet_mode = match get("SNIPPET_MODE") {
            Some(raw) => raw
                .parse::<SnippetMode>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "SNIPPET_MODE",
                    reason,
                })?,
            None => SnippetMode::default(),
        };

        let timezone = match get("DIGEST_TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "DIGEST_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => Tz::UTC,
        };

        let topics = match get("NEWS_TOPICS") {
            Some(raw) => split_list(&raw),
            None => vec!["transgender".to_string()],
        };

        let mut ai = AiConfig::default();
        if let Some(model) = get("OPENAI_MODEL") {
            ai.model = model;
        }
        if let Some(raw) = get("OPENAI_TEMPERATURE") {
            ai.temperature = Some(raw.parse::<f32>().map_err(|e| ConfigError::Invalid {
                name: "OPENAI_TEMPERATURE",
                reason: e.to_string(),
            })?);
        }
        if let Some(raw) = get("OPENAI_MAX_TOKENS") {
            ai.max_tokens = Some(raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: "OPENAI_MAX_TOKENS",
                reason: e.to_string(),
            })?);
        }

        Ok(Self {
            newsapi_key: required("NEWSAPI_KEY")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ai,
            news_limit,
            topics,
            snippet_mode,
            alert_senders: get("ALERT_SENDERS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            mail_max_results,
            timezone,
            google_credentials_file: get("GOOGLE_CREDENTIALS_FILE")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            google_token_cache: get("GOOGLE_TOKEN_CACHE")
                .unwrap_or_else(|| "data/google_token.json".to_string())
                .into(),
            google_delegated_user: get("GOOGLE_DELEGATED_USER"),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            todoist_api_key: get("TODOIST_API_KEY"),
        })
    }
}

/// Comma-separated list with blank entries dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
