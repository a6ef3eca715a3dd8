use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::digest::{format_digest, truncate_chars, DigestStyle};
use super::Notifier;
use crate::ingest::types::Item;

/// Telegram rejects messages above 4096 chars; leave headroom.
pub const MAX_MESSAGE_CHARS: usize = 4000;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    api_base: String,
    client: Client,
    style: DigestStyle,
}

impl TelegramNotifier {
    pub fn from_env(style: DigestStyle) -> Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN missing")?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").context("TELEGRAM_CHAT_ID missing")?;
        Ok(Self::new(token, chat_id, style))
    }

    pub fn new(token: String, chat_id: String, style: DigestStyle) -> Self {
        Self {
            token,
            chat_id,
            api_base: API_BASE.to_string(),
            client: Client::new(),
            style,
        }
    }

    /// Point at another Bot API host (self-hosted server or a local stub).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }
}

/// `sendMessage` body: plain text, link previews off.
pub fn message_body(chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": truncate_chars(text, MAX_MESSAGE_CHARS),
        "disable_web_page_preview": true,
    })
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        let text = format_digest(items, &self.style);
        let body = message_body(&self.chat_id, &text);

        self.client
            .post(self.endpoint())
            .timeout(Duration::from_secs(15))
            .json(&body)
            .send()
            .await
            .context("telegram post")?
            .error_for_status()
            .context("telegram non-2xx")?;
        Ok(())
    }
}
