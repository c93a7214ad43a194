// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "google/mod.rs"]
pub mod google;

#[path = "news/mod.rs"]
pub mod news;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "telegram/mod.rs"]
pub mod telegram;

#[path = "todoist/mod.rs"]
pub mod todoist;
