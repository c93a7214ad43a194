// The core module contains all business logic.
// Each feature gets its own submodule; collaborators are traits implemented in infra.

#[path = "docs/markdown_compiler.rs"]
pub mod docs;

#[path = "news/news_service.rs"]
pub mod news;

#[path = "workspace/workspace_service.rs"]
pub mod workspace;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "tasks/task_service.rs"]
pub mod tasks;

#[path = "notify/notify_service.rs"]
pub mod notify;

#[path = "digest/digest_service.rs"]
pub mod digest;
