// src/notify/digest.rs
//! Text renderings of a ranked batch: the long-form digest and a short top-item alert.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::ingest::types::Item;

const SUMMARY_PREVIEW_CHARS: usize = 300;

/// How dates and headers are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestStyle {
    pub horizon_days: u32,
    pub offset: FixedOffset,
}

impl DigestStyle {
    /// Out-of-range offsets fall back to UTC.
    pub fn new(horizon_days: u32, offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap_or_else(|| Utc.fix());
        Self {
            horizon_days,
            offset,
        }
    }

    pub fn format_date(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset)
            .format("%d/%m/%Y %H:%M")
            .to_string()
    }
}

impl Default for DigestStyle {
    fn default() -> Self {
        Self::new(3, -3)
    }
}

pub fn subject(items: &[Item], style: &DigestStyle) -> String {
    format!(
        "Promo radar: {} new item(s) from the last {} day(s)",
        items.len(),
        style.horizon_days
    )
}

pub fn format_digest(items: &[Item], style: &DigestStyle) -> String {
    if items.is_empty() {
        return format!(
            "No matching posts found in the last {} day(s).\n",
            style.horizon_days
        );
    }

    let mut out = format!(
        "Matching posts from the last {} day(s): {}\n\n",
        style.horizon_days,
        items.len()
    );
    for it in items {
        out.push_str(&format!("• Source: {}\n", it.source));
        out.push_str(&format!("  Title: {}\n", it.title));
        out.push_str(&format!("  Link: {}\n", it.link));
        if let Some(ts) = it.published_at {
            out.push_str(&format!("  Date: {}\n", style.format_date(ts)));
        }
        if !it.summary.is_empty() {
            out.push_str(&format!("  Summary: {}\n", preview(&it.summary)));
        }
        out.push('\n');
    }
    out
}

/// One-paragraph alert about the first ranked item, plus a count of the rest.
pub fn format_top_item(items: &[Item], style: &DigestStyle) -> Option<(String, String)> {
    let top = items.first()?;
    let mut desc = format!("{}\n{}", top.source, top.link);
    if let Some(ts) = top.published_at {
        desc.push_str(&format!("\n{}", style.format_date(ts)));
    }
    if items.len() > 1 {
        desc.push_str(&format!("\n+{} more in the digest", items.len() - 1));
    }
    Some((top.title.clone(), desc))
}

fn preview(s: &str) -> String {
    if s.chars().count() <= SUMMARY_PREVIEW_CHARS {
        return s.to_string();
    }
    let mut p: String = s.chars().take(SUMMARY_PREVIEW_CHARS).collect();
    p.push('…');
    p
}

/// Cut to at most `max` chars on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FetchMethod;
    use chrono::TimeZone;

    fn item(title: &str, ts: Option<DateTime<Utc>>) -> Item {
        Item {
            source: "Melhores Destinos".into(),
            title: title.into(),
            summary: "Campanha com bônus".into(),
            link: "https://a.com/1".into(),
            published_at: ts,
            method: FetchMethod::Feed,
        }
    }

    #[test]
    fn dates_render_in_display_offset() {
        let ts = Utc.with_ymd_and_hms(2025, 10, 13, 2, 30, 0).unwrap();
        let body = format_digest(&[item("Bônus 80%", Some(ts))], &DigestStyle::new(3, -3));
        assert!(body.contains("Date: 12/10/2025 23:30"), "{body}");
        assert!(body.contains("Summary: Campanha com bônus"));
        assert!(body.starts_with("Matching posts from the last 3 day(s): 1"));
    }

    #[test]
    fn empty_batch_has_nothing_found_body() {
        let body = format_digest(&[], &DigestStyle::new(5, 0));
        assert_eq!(body, "No matching posts found in the last 5 day(s).\n");
        assert!(format_top_item(&[], &DigestStyle::default()).is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("bônus", 2), "bô");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
