// src/ingest/providers/feed.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::ingest::types::{FetchMethod, RawCandidate, SourceAdapter};

/* ----------------------------
RSS 2.0
---------------------------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

// Namespace prefixes are dropped on deserialization, so `<media:title>` or an
// item-level `<atom:link>` land on the same field as the plain element. Collect
// every occurrence and keep the first non-empty one.
#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(rename = "title", default)]
    titles: Vec<String>,
    #[serde(rename = "link", default)]
    links: Vec<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "description", default)]
    descriptions: Vec<String>,
}

fn first_filled(values: Vec<String>) -> Option<String> {
    values.into_iter().find(|v| !v.trim().is_empty())
}

/* ----------------------------
Atom 1.0
---------------------------- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

// Atom text constructs carry a `type` attribute, so read the text node explicitly.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

impl AtomEntry {
    fn alternate_href(&self) -> String {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.clone())
            .unwrap_or_default()
    }
}

/// Parse an RSS 2.0 or Atom document into raw candidates.
pub fn parse_feed(xml: &str) -> Result<Vec<RawCandidate>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let head = xml_clean.trim_start();

    if looks_like_atom(head) {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        return Ok(feed.entry.into_iter().map(atom_to_candidate).collect());
    }

    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
    Ok(rss.channel.item.into_iter().map(rss_to_candidate).collect())
}

// The root element decides; an <rss> document may still mention "<feed" in its text.
fn looks_like_atom(doc: &str) -> bool {
    let root_start = doc
        .match_indices('<')
        .map(|(i, _)| &doc[i..])
        .find(|tail| !tail.starts_with("<?") && !tail.starts_with("<!"));
    root_start.is_some_and(|tail| tail.starts_with("<feed"))
}

fn rss_to_candidate(it: RssItem) -> RawCandidate {
    RawCandidate {
        title: first_filled(it.titles).unwrap_or_default(),
        summary: first_filled(it.descriptions),
        link: first_filled(it.links).unwrap_or_default(),
        timestamps: Vec::new(),
        date_strings: it.pub_date.into_iter().collect(),
    }
}

fn atom_to_candidate(e: AtomEntry) -> RawCandidate {
    let link = e.alternate_href();
    let summary = e.summary.or(e.content).map(|t| t.value);
    RawCandidate {
        title: e.title.map(|t| t.value).unwrap_or_default(),
        summary,
        link,
        timestamps: Vec::new(),
        date_strings: [e.published, e.updated].into_iter().flatten().collect(),
    }
}

/// Feeds from WordPress blogs love HTML-only entities (`&nbsp;`, `&ecirc;`) that
/// XML parsers reject. Decode those to characters; escape unknown ones as text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").unwrap());
    re.replace_all(s, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] || decoded.contains(['<', '&']) {
            format!("&amp;{name};")
        } else {
            decoded.into_owned()
        }
    })
    .into_owned()
}

pub struct FeedAdapter {
    name: String,
    base_url: Option<Url>,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: Url,
        client: reqwest::Client,
    },
}

impl FeedAdapter {
    /// Adapter over an in-memory document (tests, offline replays).
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            base_url: None,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(
        name: impl Into<String>,
        url: Url,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            name: name.into(),
            base_url: Some(url.clone()),
            mode: Mode::Http { url, client },
        })
    }

    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    async fn body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(anyhow!("feed {url} returned status {status}"));
                }
                resp.text().await.context("feed http .text()")
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> FetchMethod {
        FetchMethod::Feed
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    async fn fetch(&self) -> Result<Vec<RawCandidate>> {
        let body = self.body().await?;

        let t0 = std::time::Instant::now();
        let out = parse_feed(&body).with_context(|| format!("feed source {}", self.name))?;
        histogram!("radar_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("radar_candidates_total").increment(out.len() as u64);

        Ok(out)
    }
}
