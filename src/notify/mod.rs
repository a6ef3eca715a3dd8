// src/notify/mod.rs
//! Notification sinks. Each sink gets the whole ranked batch; one failing sink
//! never stops the others.

pub mod digest;
pub mod discord;
pub mod email;
pub mod telegram;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use metrics::counter;
use std::sync::Mutex;

use crate::config::NotifySettings;
use crate::error::RadarError;
use crate::ingest::types::Item;

pub use digest::DigestStyle;
pub use discord::DiscordNotifier;
pub use email::EmailNotifier;
pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver the ranked batch. May be empty when `notify_when_empty` is set.
    async fn deliver(&self, items: &[Item]) -> Result<()>;
}

/// Digest preview on stdout.
pub struct ConsoleNotifier {
    style: DigestStyle,
}

impl ConsoleNotifier {
    pub fn new(style: DigestStyle) -> Self {
        Self { style }
    }
}

#[async_trait::async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        println!("\n===== DIGEST PREVIEW =====\n");
        println!("{}", digest::format_digest(items, &self.style));
        Ok(())
    }
}

/// Records every delivered batch; can be switched to fail. For tests and tools.
pub struct MemorySink {
    name: String,
    fail: bool,
    pub batches: Mutex<Vec<Vec<Item>>>,
}

impl MemorySink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn delivered(&self) -> Vec<Vec<Item>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        if self.fail {
            return Err(anyhow!("{} configured to fail", self.name));
        }
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(items.to_vec());
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, items: &[Item]) -> Result<()> {
        (**self).deliver(items).await
    }
}

#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: String,
    pub primary: bool,
    pub error: Option<RadarError>,
}

impl SinkOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered set of sinks with one designated primary.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn Notifier>>,
    primary: Option<String>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Box<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_primary(mut self, name: impl Into<String>) -> Self {
        self.primary = Some(name.into());
        self
    }

    /// Explicit primary, else the first sink.
    pub fn primary(&self) -> Option<&str> {
        self.primary
            .as_deref()
            .or_else(|| self.sinks.first().map(|s| s.name()))
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver to every sink concurrently; outcomes come back in sink order.
    pub async fn deliver_all(&self, items: &[Item]) -> Vec<SinkOutcome> {
        let primary = self.primary().map(str::to_string);
        let results = join_all(self.sinks.iter().map(|s| s.deliver(items))).await;

        self.sinks
            .iter()
            .zip(results)
            .map(|(sink, res)| {
                let name = sink.name().to_string();
                let error = match res {
                    Ok(()) => {
                        tracing::info!(target: "notify", sink = %name, items = items.len(), "delivered");
                        None
                    }
                    Err(e) => {
                        counter!("radar_sink_errors_total").increment(1);
                        tracing::warn!(target: "notify", sink = %name, error = %format!("{e:#}"), "sink failed");
                        Some(RadarError::SinkDelivery {
                            sink: name.clone(),
                            reason: format!("{e:#}"),
                        })
                    }
                };
                SinkOutcome {
                    primary: primary.as_deref() == Some(name.as_str()),
                    sink: name,
                    error,
                }
            })
            .collect()
    }
}

/// Build enabled sinks in default-primary order. An enabled sink with missing
/// credentials is a configuration error.
pub fn build_sinks(settings: &NotifySettings, horizon_days: u32) -> Result<SinkSet> {
    let style = DigestStyle::new(horizon_days, settings.display_offset_hours);
    let mut set = SinkSet::new();
    for name in settings.enabled() {
        let sink: Box<dyn Notifier> = match name {
            "email" => Box::new(EmailNotifier::from_env(style).context("email sink")?),
            "telegram" => Box::new(TelegramNotifier::from_env(style).context("telegram sink")?),
            "discord" => Box::new(DiscordNotifier::from_env(style).context("discord sink")?),
            _ => Box::new(ConsoleNotifier::new(style)),
        };
        set = set.with_sink(sink);
    }
    if let Some(p) = settings.primary_sink() {
        set = set.with_primary(p);
    }
    Ok(set)
}
