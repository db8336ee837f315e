use async_trait::async_trait;
use crate::error::Result;
use crate::interfaces::Notifier;

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        tracing::info!(target: "notification", "{}", text);
        Ok(())
    }
}
