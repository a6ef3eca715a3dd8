use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::digest::{format_digest, subject, DigestStyle};
use super::Notifier;
use crate::ingest::types::Item;

/// Full digest as a plain-text email over SMTP (STARTTLS relay).
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    style: DigestStyle,
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} missing"))
}

impl EmailNotifier {
    pub fn from_env(style: DigestStyle) -> Result<Self> {
        let host = required_env("SMTP_HOST")?;
        let user = required_env("SMTP_USER")?;
        let pass = required_env("SMTP_PASS")?;
        let from_addr = required_env("NOTIFY_EMAIL_FROM")?;
        let to_addr = required_env("NOTIFY_EMAIL_TO")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Self {
            mailer,
            from,
            to,
            style,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject(items, &self.style))
            .header(header::ContentType::TEXT_PLAIN)
            .body(format_digest(items, &self.style))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
