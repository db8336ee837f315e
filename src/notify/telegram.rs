use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::error::{Error, Result};
use crate::interfaces::Notifier;

/// Bot API message length limit, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        TelegramNotifier {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }
}

/// Cuts `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[derive(Deserialize)]
struct SendMessageReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let text = truncate_chars(text, MAX_MESSAGE_CHARS);

        let response = self.client
            .get(format!("{}/bot{}/sendMessage", self.api_base, self.token))
            .query(&[
                ("chat_id", self.chat_id.as_str()),
                ("text", text),
                ("parse_mode", "html"),
                ("disable_web_page_preview", "false"),
            ])
            .send()
            .await
            .map_err(|e| Error::Notification(format!("telegram request failed: {}", e)))?;

        let reply: SendMessageReply = response
            .json()
            .await
            .map_err(|e| Error::Notification(format!("telegram reply unreadable: {}", e)))?;

        if !reply.ok {
            return Err(Error::Notification(format!(
                "telegram rejected message: {}",
                reply.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        tracing::debug!("Telegram message delivered to {}", self.chat_id);
        Ok(())
    }
}
