pub mod format;
pub mod log_notifier;
pub mod telegram;

pub use format::{format_opportunity, format_summary};
pub use log_notifier::LogNotifier;
pub use telegram::TelegramNotifier;
