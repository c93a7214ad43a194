use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the mail or calendar provider.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Workspace API error: {0}")]
    Api(String),
    #[error("Workspace authentication failed: {0}")]
    Auth(String),
}

/// Header fields of one received email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub from: String,
    pub date: String,
    pub snippet: String,
}

impl Default for EmailMessage {
    fn default() -> Self {
        Self {
            subject: "No Subject".to_string(),
            from: "Unknown".to_string(),
            date: "Unknown Date".to_string(),
            snippet: String::new(),
        }
    }
}

/// An upcoming calendar entry. `start` is passed through as the provider formats it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: String,
}

#[async_trait]
pub trait MailSource: Send + Sync {
    /// Messages received within the last `window`.
    async fn recent_messages(
        &self,
        window: chrono::Duration,
    ) -> Result<Vec<EmailMessage>, WorkspaceError>;
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Events starting in `[from, to)`, ordered by start time.
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, WorkspaceError>;
}

/// Sender addresses whose mail gets flagged in the digest. Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct AlertSenders {
    addresses: Vec<String>,
}

impl AlertSenders {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    pub fn is_alert(&self, from_header: &str) -> bool {
        let sender = extract_email_address(from_header);
        self.addresses.iter().any(|a| *a == sender)
    }
}

/// Pulls the address out of a `From` header such as `Jane <jane@example.com>`.
/// Falls back to the whole header. Always lowercased.
pub fn extract_email_address(from_header: &str) -> String {
    if let Some(start) = from_header.find('<') {
        let rest = &from_header[start + 1..];
        if let Some(end) = rest.find('>') {
            if end > 0 {
                return rest[..end].to_lowercase();
            }
        }
    }
    from_header.trim().to_lowercase()
}

pub fn compile_emails_section(messages: &[EmailMessage], alert_senders: &AlertSenders) -> String {
    let mut section = String::from("### Emails Received in the Last 24 Hours\n\n");

    if messages.is_empty() {
        section.push_str("No emails received in the last 24 hours.\n\n");
        return section;
    }

    for message in messages {
        let alert = if alert_senders.is_alert(&message.from) {
            " [ALERT]"
        } else {
            ""
        };

        section.push_str(&format!("**Subject:** {}{}\n", message.subject, alert));
        section.push_str(&format!("**From:** {}\n", message.from));
        section.push_str(&format!("**Date:** {}\n", message.date));
        section.push_str(&format!("Snippet: {}\n\n", message.snippet));
    }

    section
}

pub fn compile_calendar_section(events: &[CalendarEvent]) -> String {
    let mut section = String::from("### Calendar Events in the Next 24 Hours\n\n");

    if events.is_empty() {
        section.push_str("No upcoming events in the next 24 hours.\n\n");
    } else {
        for event in events {
            section.push_str(&format!("**{}** at {}\n\n", event.summary, event.start));
        }
    }

    section
}
