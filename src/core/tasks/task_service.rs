use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task tracker API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Creates one task due on `due_date`.
    async fn create_task(&self, content: &str, due_date: NaiveDate) -> Result<(), TaskError>;
}

/// Splits a model answer into task descriptions.
///
/// Each non-blank line loses any surrounding `-` and space characters (list
/// bullets), then surrounding whitespace.
pub fn parse_task_lines(answer: &str) -> Vec<String> {
    answer
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_matches(|c| c == '-' || c == ' ').trim().to_string())
        .filter(|task| !task.is_empty())
        .collect()
}

/// Creates every task, logging failures without stopping. Returns how many succeeded.
pub async fn create_tasks(tracker: &dyn TaskTracker, tasks: &[String], due_date: NaiveDate) -> usize {
    let mut created = 0;

    for task in tasks {
        match tracker.create_task(task, due_date).await {
            Ok(()) => {
                tracing::info!("Task created: {}", task);
                created += 1;
            }
            Err(e) => tracing::warn!("Failed to create task '{}': {}", task, e),
        }
    }

    created
}
