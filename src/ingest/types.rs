// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// How a candidate was discovered. Diagnostics only; filtering never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchMethod {
    Feed,
    Scrape,
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMethod::Feed => f.write_str("FEED"),
            FetchMethod::Scrape => f.write_str("SCRAPE"),
        }
    }
}

/// Raw record as an adapter saw it. Nothing here is cleaned or validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    /// Structured unix timestamps (seconds), highest priority first.
    pub timestamps: Vec<i64>,
    /// Free-text dates in priority order (published, updated, created).
    pub date_strings: Vec<String>,
}

impl RawCandidate {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date_strings.push(date.into());
        self
    }

    pub fn with_timestamp(mut self, unix_secs: i64) -> Self {
        self.timestamps.push(unix_secs);
        self
    }
}

/// One discovered candidate after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub method: FetchMethod,
}

impl Item {
    /// Text the keyword rules run against.
    pub fn match_text(&self) -> String {
        if self.summary.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.summary)
        }
    }
}

/// Per-source facts the normalizer needs besides the raw record.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub base_url: Option<Url>,
    pub method: FetchMethod,
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier; becomes `Item::source` and half of the ledger key.
    fn name(&self) -> &str;

    fn method(&self) -> FetchMethod;

    /// Base for resolving relative links.
    fn base_url(&self) -> Option<&Url>;

    /// Fetch raw candidates. Adapters never filter or deduplicate.
    async fn fetch(&self) -> Result<Vec<RawCandidate>>;

    fn context(&self) -> SourceContext {
        SourceContext {
            name: self.name().to_string(),
            base_url: self.base_url().cloned(),
            method: self.method(),
        }
    }
}
