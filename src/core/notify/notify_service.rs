use async_trait::async_trait;
use thiserror::Error;

/// Telegram rejects messages longer than this many characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Chat API error: {0}")]
    Api(String),
    #[error("Chat notifier not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Appends the document link to the summary, shortening the summary so the
/// link always survives the length limit.
pub fn compose_chat_message(summary: &str, document_url: &str) -> String {
    let footer = format!("\n\nFor more details see {}", document_url);
    let footer_len = footer.chars().count();
    let summary_len = summary.chars().count();

    if summary_len + footer_len <= MAX_CHAT_MESSAGE_CHARS {
        return format!("{}{}", summary, footer);
    }

    let keep = MAX_CHAT_MESSAGE_CHARS.saturating_sub(footer_len + 3);
    let mut shortened: String = summary.chars().take(keep).collect();
    shortened.push_str("...");
    shortened.push_str(&footer);
    shortened
}
