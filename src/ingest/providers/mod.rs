// src/ingest/providers/mod.rs
pub mod feed;
pub mod page_scan;

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::{FetchSettings, SourceConfig, SourceKind};
use crate::ingest::types::SourceAdapter;

pub use feed::FeedAdapter;
pub use page_scan::PageScanAdapter;

/// Build one HTTP adapter per configured source, preserving config order.
pub fn build_adapters(
    sources: &[SourceConfig],
    fetch: &FetchSettings,
) -> Result<Vec<Box<dyn SourceAdapter>>> {
    let timeout = Duration::from_secs(fetch.timeout_secs);
    let mut out: Vec<Box<dyn SourceAdapter>> = Vec::with_capacity(sources.len());
    for s in sources {
        let url = s.parsed_url()?;
        let base = s.parsed_base_url()?;
        let adapter: Box<dyn SourceAdapter> = match s.kind {
            SourceKind::Feed => {
                let mut a = FeedAdapter::from_url(&s.name, url, &fetch.user_agent, timeout)
                    .with_context(|| format!("source `{}`", s.name))?;
                if let Some(b) = base {
                    a = a.with_base_url(b);
                }
                Box::new(a)
            }
            SourceKind::Page => {
                let mut a = PageScanAdapter::from_url(&s.name, url, &fetch.user_agent, timeout)
                    .with_context(|| format!("source `{}`", s.name))?;
                if let Some(b) = base {
                    a = a.with_base_url(b);
                }
                Box::new(a)
            }
        };
        out.push(adapter);
    }
    Ok(out)
}
