use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::digest::{format_top_item, DigestStyle};
use super::Notifier;
use crate::ingest::types::Item;

/// Short top-item alert to a Discord webhook, retried with exponential backoff.
#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    style: DigestStyle,
}

impl DiscordNotifier {
    pub fn new(webhook: String, style: DigestStyle) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
            style,
        }
    }

    pub fn from_env(style: DigestStyle) -> Result<Self> {
        let webhook = std::env::var("DISCORD_WEBHOOK_URL").context("DISCORD_WEBHOOK_URL missing")?;
        Ok(Self::new(webhook, style))
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post_with_retries(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "notify", attempt, error = %err, "discord retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        let payload = match format_top_item(items, &self.style) {
            Some((title, description)) => DiscordWebhookPayload::embed(&title, &description),
            None => DiscordWebhookPayload::text(&format!(
                "No matching posts in the last {} day(s).",
                self.style.horizon_days
            )),
        };
        self.post_with_retries(&payload).await
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn embed(title: &str, description: &str) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                // Discord caps embed titles at 256 chars.
                title: super::digest::truncate_chars(title, 256).to_string(),
                description: description.to_string(),
            }],
        }
    }

    fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            embeds: Vec::new(),
        }
    }
}
