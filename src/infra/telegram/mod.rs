pub mod telegram_client;

pub use telegram_client::TelegramNotifier;
