// This is the entry point of the daily digest.
//
// **Architecture Overview:**
// - `core/` = Business logic (compiler, section builders, pipeline, traits)
// - `infra/` = Implementations of core traits (Google, NewsAPI, OpenAI, Telegram, Todoist)
//
// This file's job is to:
// 1. Load configuration and command-line flags
// 2. Initialize clients (dependency injection)
// 3. Run the digest once and report where it went

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod cli;
mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::cli::Cli;
use crate::config::DigestConfig;
use crate::core::ai::ai_service::DEFAULT_SYSTEM_PROMPT;
use crate::core::ai::{AiProvider, SummaryService};
use crate::core::digest::{DigestService, DigestSettings};
use crate::core::workspace::AlertSenders;
use crate::infra::ai::OpenAiClient;
use crate::infra::google::{GmailClient, GoogleAuth, GoogleCalendarClient, GoogleDocsClient};
use crate::infra::news::{HttpArticleFetcher, NewsApiClient};
use crate::infra::telegram::TelegramNotifier;
use crate::infra::todoist::TodoistClient;

const USER_AGENT: &str = concat!("daily_digest/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let options = cli.run_options();
    let config = DigestConfig::from_env().context("Failed to load configuration")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    // One authenticator (and one cached token) serves docs, gmail and calendar.
    let auth = Arc::new(
        GoogleAuth::from_file(&config.google_credentials_file)
            .await
            .with_context(|| {
                format!(
                    "Failed to load Google credentials from {}",
                    config.google_credentials_file.display()
                )
            })?
            .with_subject(config.google_delegated_user.clone())
            .with_token_cache(config.google_token_cache.clone()),
    );

    let ai_client: Box<dyn AiProvider> = Box::new(
        OpenAiClient::new(config.openai_api_key.clone()).with_base_url(config.openai_base_url.clone()),
    );
    let summarizer = SummaryService::new(
        ai_client,
        DEFAULT_SYSTEM_PROMPT.to_string(),
        config.ai.clone(),
    );

    let news = NewsApiClient::new(config.newsapi_key.clone(), USER_AGENT)
        .context("Failed to create NewsAPI client")?;
    let fetcher = HttpArticleFetcher::new(USER_AGENT, config.snippet_mode)
        .context("Failed to create article fetcher")?;

    let settings = DigestSettings {
        news_limit: config.news_limit,
        topics: config.topics.clone(),
        alert_senders: AlertSenders::new(&config.alert_senders),
        timezone: config.timezone,
    };

    let mut digest = DigestService::new(
        summarizer,
        Box::new(news),
        Box::new(fetcher),
        Box::new(GoogleDocsClient::new(Arc::clone(&auth))),
        settings,
    )
    .with_mail(Box::new(GmailClient::new(
        Arc::clone(&auth),
        config.mail_max_results,
    )))
    .with_calendar(Box::new(GoogleCalendarClient::new(Arc::clone(&auth))));

    match &config.telegram_bot_token {
        Some(token) => {
            digest = digest.with_notifier(Box::new(TelegramNotifier::new(
                token.clone(),
                config.telegram_chat_id.clone(),
            )));
        }
        None => tracing::info!("TELEGRAM_BOT_TOKEN not set, chat updates disabled"),
    }

    match &config.todoist_api_key {
        Some(key) => {
            digest = digest.with_task_tracker(Box::new(TodoistClient::new(key.clone())));
        }
        None => tracing::info!("TODOIST_API_KEY not set, task extraction disabled"),
    }

    // ========================================================================
    // RUN
    // ========================================================================

    tracing::info!("Building digest (topics: {:?})", config.topics);
    let report = digest.run(&options).await.context("Digest run failed")?;

    if options.dry_run {
        println!("{}", report.markdown);
        return Ok(());
    }

    if let Some(url) = &report.document_url {
        println!("{}", url);
    }
    tracing::info!(
        "Digest '{}' published (chat update sent: {}, tasks created: {})",
        report.title,
        report.notified,
        report.tasks_created
    );

    Ok(())
}
