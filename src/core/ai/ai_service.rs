use super::models::{AiConfig, AiMessage};
use async_trait::async_trait;
use std::error::Error;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI Agent.";

pub const TOP_STORIES_PROMPT: &str = "Summarize the following top news headlines, including key points and context. \
     Include the links provided as references.";

pub const EMAILS_PROMPT: &str = "Summarize the following email headlines and snippets, highlighting any alerts. \
     Focus on key subjects and senders.";

pub const CHAT_UPDATE_PROMPT: &str =
    "Summarize the following content for a quick Telegram update:";

/// Instruction used for a topic-filtered news section.
pub fn topic_prompt(topic: &str) -> String {
    format!(
        "Summarize the following {}-related news headlines, highlighting the main themes and events. \
         Include the links provided as references.",
        topic
    )
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and returns the raw answer text.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

// Lets the digest hold whichever provider was configured at startup.
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        (**self).chat_complete(messages, config).await
    }
}

/// Wraps an `AiProvider` with the system prompt and the summarization prompt shape.
pub struct SummaryService<P: AiProvider> {
    provider: P,
    system_prompt: String,
    config: AiConfig,
}

impl<P: AiProvider> SummaryService<P> {
    pub fn new(provider: P, system_prompt: String, config: AiConfig) -> Self {
        Self {
            provider,
            system_prompt,
            config,
        }
    }

    /// Sends a single user prompt. The answer is trimmed.
    pub async fn ask(&self, prompt: String) -> Result<String, Box<dyn Error + Send + Sync>> {
        let messages = vec![
            AiMessage::system(self.system_prompt.clone()),
            AiMessage::user(prompt),
        ];

        let answer = self.provider.chat_complete(&messages, &self.config).await?;
        Ok(answer.trim().to_string())
    }

    /// Summarizes `text` following `instruction`. Returns an empty string on failure.
    pub async fn summarize(&self, text: &str, instruction: &str) -> String {
        let prompt = format!("{}\n\n{}\n\nSummary:", instruction, text);

        match self.ask(prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Summarization failed: {}", e);
                String::new()
            }
        }
    }

    /// Asks for actionable tasks in `text`, one per line. Returns an empty string on failure.
    pub async fn extract_tasks(&self, text: &str) -> String {
        let prompt = format!(
            "Extract actionable todo tasks from the following text. \
             List each task on a new line. Only include tasks that can be completed today.\n\n\
             {}\n\nTasks:",
            text
        );

        match self.ask(prompt).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("Task extraction failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: Result<String, String>,
        seen: Mutex<Vec<Vec<AiMessage>>>,
    }

    impl ScriptedProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("boom".to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(|e| e.into())
        }
    }

    #[tokio::test]
    async fn test_summarize_builds_prompt_and_trims() {
        let service = SummaryService::new(
            ScriptedProvider::replying("  short summary \n"),
            DEFAULT_SYSTEM_PROMPT.to_string(),
            AiConfig::default(),
        );

        let summary = service.summarize("body text", "Summarize this.").await;

        assert_eq!(summary, "short summary");
        let seen = service.provider.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![
                AiMessage::system(DEFAULT_SYSTEM_PROMPT),
                AiMessage::user("Summarize this.\n\nbody text\n\nSummary:"),
            ]
        );
    }

    #[tokio::test]
    async fn test_summarize_failure_is_empty() {
        let service = SummaryService::new(
            ScriptedProvider::failing(),
            DEFAULT_SYSTEM_PROMPT.to_string(),
            AiConfig::default(),
        );

        assert_eq!(service.summarize("text", "Summarize").await, "");
        assert_eq!(service.extract_tasks("text").await, "");
    }

    #[tokio::test]
    async fn test_extract_tasks_prompt() {
        let service = SummaryService::new(
            ScriptedProvider::replying("- Call Alex"),
            DEFAULT_SYSTEM_PROMPT.to_string(),
            AiConfig::default(),
        );

        assert_eq!(service.extract_tasks("report").await, "- Call Alex");
        let seen = service.provider.seen.lock().unwrap();
        let prompt = &seen[0][1].content;
        assert!(prompt.starts_with("Extract actionable todo tasks"));
        assert!(prompt.ends_with("\n\nreport\n\nTasks:"));
    }

    #[test]
    fn test_topic_prompt_mentions_topic() {
        assert!(topic_prompt("climate").contains("climate-related news headlines"));
    }
}
