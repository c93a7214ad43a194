pub mod todoist_client;

pub use todoist_client::TodoistClient;
