//! Page scanner for promotion pages without a feed.
//!
//! Reads one page and turns every `a[href]` anchor into a raw candidate
//! (anchor text → title, href → link, href path words → summary). No link
//! following, no dates.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use crate::ingest::types::{FetchMethod, RawCandidate, SourceAdapter};

/// Extract anchor candidates from an HTML document.
pub fn scan_anchors(html: &str) -> Vec<RawCandidate> {
    let document = Html::parse_document(html);
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&anchor_selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            let text = el.text().collect::<Vec<_>>().join(" ");
            let title = if text.trim().is_empty() {
                // Image-only links often carry their label in `title`/`aria-label`
                el.value()
                    .attr("title")
                    .or_else(|| el.value().attr("aria-label"))
                    .unwrap_or_default()
                    .to_string()
            } else {
                text
            };
            let candidate = RawCandidate::new(title, href);
            Some(match href_words(href) {
                Some(words) => candidate.with_summary(words),
                None => candidate,
            })
        })
        .collect()
}

/// Path segments of a web href as plain words, so "Saiba mais" pointing at
/// `/promocoes/bonus-transferencia` still reaches the keyword rules.
fn href_words(href: &str) -> Option<String> {
    let path = match Url::parse(href) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => u.path().to_string(),
        Ok(_) => return None,
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let words = path
        .split(['/', '-', '_', '.', '+'])
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!words.is_empty()).then_some(words)
}

pub struct PageScanAdapter {
    name: String,
    page_url: Url,
    base_url: Url,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http(reqwest::Client),
}

impl PageScanAdapter {
    pub fn from_fixture(name: impl Into<String>, page_url: Url, html: &str) -> Self {
        Self {
            name: name.into(),
            base_url: page_url.clone(),
            page_url,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_url(
        name: impl Into<String>,
        page_url: Url,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building page-scan http client")?;
        Ok(Self {
            name: name.into(),
            base_url: page_url.clone(),
            page_url,
            mode: Mode::Http(client),
        })
    }

    /// Override the base used for relative hrefs (defaults to the page URL).
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = base;
        self
    }

    async fn body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http(client) => {
                let resp = client
                    .get(self.page_url.clone())
                    .send()
                    .await
                    .with_context(|| format!("page http get {}", self.page_url))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(anyhow!("page {} returned status {status}", self.page_url));
                }
                resp.text().await.context("page http .text()")
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for PageScanAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> FetchMethod {
        FetchMethod::Scrape
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base_url)
    }

    async fn fetch(&self) -> Result<Vec<RawCandidate>> {
        let html = self.body().await?;

        let t0 = std::time::Instant::now();
        let out = scan_anchors(&html);
        histogram!("radar_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("radar_candidates_total").increment(out.len() as u64);

        tracing::debug!(target: "ingest", source = %self.name, anchors = out.len(), "page scanned");
        Ok(out)
    }
}
