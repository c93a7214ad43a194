// =============================================================================
// DIGEST PIPELINE
// =============================================================================
//
// Gathers every section, summarizes it, assembles the report and hands it to
// the document store, chat notifier and task tracker in that order.
//
// Every collaborator except the document store is allowed to fail: the failure
// is logged and the run continues with an empty section or skips the step.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::core::ai::ai_service::{
    topic_prompt, CHAT_UPDATE_PROMPT, EMAILS_PROMPT, TOP_STORIES_PROMPT,
};
use crate::core::ai::{AiProvider, SummaryService};
use crate::core::docs::{publish_markdown, DocumentError, DocumentStore};
use crate::core::news::{gather_news_section, ArticleFetcher, NewsSource};
use crate::core::notify::{compose_chat_message, ChatNotifier};
use crate::core::tasks::{create_tasks, parse_task_lines, TaskTracker};
use crate::core::workspace::{
    compile_calendar_section, compile_emails_section, AlertSenders, CalendarSource, MailSource,
};

pub const TOP_STORIES_TITLE: &str = "Top Stories";

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Failed to publish digest document: {0}")]
    Publish(#[from] DocumentError),
}

/// Settings that shape the report.
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub news_limit: usize,
    pub topics: Vec<String>,
    pub alert_senders: AlertSenders,
    pub timezone: Tz,
}

/// Per-run switches, usually from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub skip_mail: bool,
    pub skip_calendar: bool,
    pub skip_notify: bool,
    pub skip_tasks: bool,
}

/// One summarized news section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDigest {
    pub title: String,
    pub summary: String,
    pub section: String,
}

/// Everything that goes into the report. `None` leaves the block out entirely.
#[derive(Debug, Clone, Default)]
pub struct DigestSections {
    pub emails_summary: Option<String>,
    pub calendar_section: Option<String>,
    pub news: Vec<NewsDigest>,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct DigestReport {
    pub title: String,
    pub markdown: String,
    pub document_url: Option<String>,
    pub notified: bool,
    pub tasks_created: usize,
}

/// Lays the sections out as the report's Markdown.
pub fn assemble_digest(sections: &DigestSections) -> String {
    let mut text = String::new();

    if let Some(emails_summary) = &sections.emails_summary {
        text.push_str("## Email Summaries (Last 24 Hours)\n\n");
        text.push_str("### Emails Summary\n\n");
        text.push_str(&format!("{}\n\n", emails_summary));
    }

    if let Some(calendar_section) = &sections.calendar_section {
        text.push_str("## Calendar Events (Next 24 Hours)\n\n");
        text.push_str(&format!("{}\n", calendar_section));
    }

    text.push_str("## News Summaries\n\n");
    for news in &sections.news {
        text.push_str(&format!("### {} Summary\n\n", news.title));
        text.push_str(&format!("{}\n\n", news.summary));
        text.push_str(&format!("Detailed {}:\n\n", news.title));
        text.push_str(&format!("{}\n\n", news.section));
    }

    text
}

/// Document title for the given day.
pub fn digest_title(day: NaiveDate) -> String {
    format!("activity for {}", day.format("%Y-%m-%d"))
}

/// Section heading for a topic query: "climate" becomes "Climate News".
pub fn topic_title(topic: &str) -> String {
    let mut chars = topic.trim().chars();
    match chars.next() {
        Some(first) => format!("{}{} News", first.to_uppercase(), chars.as_str()),
        None => "News".to_string(),
    }
}

pub struct DigestService<P: AiProvider> {
    summarizer: SummaryService<P>,
    news: Box<dyn NewsSource>,
    fetcher: Box<dyn ArticleFetcher>,
    documents: Box<dyn DocumentStore>,
    mail: Option<Box<dyn MailSource>>,
    calendar: Option<Box<dyn CalendarSource>>,
    notifier: Option<Box<dyn ChatNotifier>>,
    tasks: Option<Box<dyn TaskTracker>>,
    settings: DigestSettings,
}

impl<P: AiProvider> DigestService<P> {
    pub fn new(
        summarizer: SummaryService<P>,
        news: Box<dyn NewsSource>,
        fetcher: Box<dyn ArticleFetcher>,
        documents: Box<dyn DocumentStore>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            summarizer,
            news,
            fetcher,
            documents,
            mail: None,
            calendar: None,
            notifier: None,
            tasks: None,
            settings,
        }
    }

    pub fn with_mail(mut self, mail: Box<dyn MailSource>) -> Self {
        self.mail = Some(mail);
        self
    }

    pub fn with_calendar(mut self, calendar: Box<dyn CalendarSource>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn ChatNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_task_tracker(mut self, tasks: Box<dyn TaskTracker>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub async fn run(&self, options: &RunOptions) -> Result<DigestReport, DigestError> {
        self.run_at(options, Utc::now()).await
    }

    /// Runs the whole pipeline as if the current time were `now`.
    pub async fn run_at(
        &self,
        options: &RunOptions,
        now: DateTime<Utc>,
    ) -> Result<DigestReport, DigestError> {
        let today = now.with_timezone(&self.settings.timezone).date_naive();
        let title = digest_title(today);

        let news = self.news_digests().await;
        let sections = DigestSections {
            emails_summary: self.emails_summary(options).await,
            calendar_section: self.calendar_section(options, now).await,
            news,
        };
        let markdown = assemble_digest(&sections);

        let mut report = DigestReport {
            title,
            markdown,
            document_url: None,
            notified: false,
            tasks_created: 0,
        };

        if options.dry_run {
            tracing::info!("Dry run: skipping document, chat and task publication");
            return Ok(report);
        }

        let document_url =
            publish_markdown(self.documents.as_ref(), &report.title, &report.markdown).await?;
        tracing::info!("Digest document created at: {}", document_url);

        if !options.skip_notify {
            report.notified = self.notify(&report.markdown, &document_url).await;
        }

        if !options.skip_tasks {
            report.tasks_created = self.create_tasks(&report.markdown, today).await;
        }

        report.document_url = Some(document_url);
        Ok(report)
    }

    async fn news_digests(&self) -> Vec<NewsDigest> {
        let mut digests = Vec::new();

        let top_section = gather_news_section(
            self.news.as_ref(),
            self.fetcher.as_ref(),
            None,
            self.settings.news_limit,
            TOP_STORIES_TITLE,
        )
        .await;
        digests.push(NewsDigest {
            title: TOP_STORIES_TITLE.to_string(),
            summary: self
                .summarizer
                .summarize(&top_section, TOP_STORIES_PROMPT)
                .await,
            section: top_section,
        });

        for topic in &self.settings.topics {
            let title = topic_title(topic);
            let section = gather_news_section(
                self.news.as_ref(),
                self.fetcher.as_ref(),
                Some(topic.as_str()),
                self.settings.news_limit,
                &title,
            )
            .await;
            digests.push(NewsDigest {
                summary: self
                    .summarizer
                    .summarize(&section, &topic_prompt(topic))
                    .await,
                title,
                section,
            });
        }

        digests
    }

    async fn emails_summary(&self, options: &RunOptions) -> Option<String> {
        if options.skip_mail {
            return None;
        }
        let mail = self.mail.as_ref()?;

        let section = match mail.recent_messages(Duration::days(1)).await {
            Ok(messages) => {
                tracing::info!("Fetched {} email(s)", messages.len());
                compile_emails_section(&messages, &self.settings.alert_senders)
            }
            Err(e) => {
                tracing::error!("Error fetching emails: {}", e);
                return Some(String::new());
            }
        };

        Some(self.summarizer.summarize(&section, EMAILS_PROMPT).await)
    }

    async fn calendar_section(&self, options: &RunOptions, now: DateTime<Utc>) -> Option<String> {
        if options.skip_calendar {
            return None;
        }
        let calendar = self.calendar.as_ref()?;

        match calendar.events_between(now, now + Duration::days(1)).await {
            Ok(events) => {
                tracing::info!("Fetched {} calendar event(s)", events.len());
                Some(compile_calendar_section(&events))
            }
            Err(e) => {
                tracing::error!("Error fetching calendar events: {}", e);
                Some(String::new())
            }
        }
    }

    async fn notify(&self, markdown: &str, document_url: &str) -> bool {
        let Some(notifier) = self.notifier.as_ref() else {
            tracing::debug!("No chat notifier configured");
            return false;
        };

        let summary = self.summarizer.summarize(markdown, CHAT_UPDATE_PROMPT).await;
        if summary.is_empty() {
            tracing::warn!("Empty chat summary, not posting a message");
            return false;
        }

        match notifier
            .send_message(&compose_chat_message(&summary, document_url))
            .await
        {
            Ok(()) => {
                tracing::info!("Message posted to chat successfully");
                true
            }
            Err(e) => {
                tracing::error!("Failed to post chat message: {}", e);
                false
            }
        }
    }

    async fn create_tasks(&self, markdown: &str, today: NaiveDate) -> usize {
        let Some(tracker) = self.tasks.as_ref() else {
            tracing::debug!("No task tracker configured");
            return 0;
        };

        let tasks = parse_task_lines(&self.summarizer.extract_tasks(markdown).await);
        if tasks.is_empty() {
            tracing::info!("No valid tasks found");
            return 0;
        }

        create_tasks(&**tracker, &tasks, today).await
    }
}
