// src/ingest/mod.rs
pub mod dates;
pub mod providers;
pub mod types;

use crate::ingest::types::{Item, RawCandidate, SourceContext};
use once_cell::sync::OnceCell;
use regex::Regex;
use url::Url;

pub const TITLE_MAX_CHARS: usize = 300;
pub const SUMMARY_MAX_CHARS: usize = 1500;

/// Normalize text: drop markup, decode entities, collapse whitespace, trim, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) Drop script/style bodies and comments entirely
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
    });
    let mut out = re_blocks.replace_all(s, " ").to_string();

    // 2) Strip remaining tags (a tag boundary separates words)
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)</?[a-zA-Z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) HTML entity decode
    out = html_escape::decode_html_entities(&out).to_string();

    // 4) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 5) Collapse whitespace (NBSP included)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 6) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect::<String>().trim_end().to_string();
    }

    out
}

/// Resolve `raw` to an absolute http(s) URL, joining relative links onto `base`.
/// Fragment-only, scheme-less without a base, and non-web links yield `None`.
pub fn resolve_link(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let url = match Url::parse(raw) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok()?,
        Err(_) => return None,
    };
    matches!(url.scheme(), "http" | "https")
        .then(|| url.to_string())
}

/// Convert one raw candidate into an `Item`, or `None` when title or link end up empty.
pub fn normalize(ctx: &SourceContext, raw: RawCandidate) -> Option<Item> {
    let title = normalize_text(&raw.title, TITLE_MAX_CHARS);
    if title.is_empty() {
        return None;
    }
    let link = resolve_link(&raw.link, ctx.base_url.as_ref())?;
    let summary = raw
        .summary
        .as_deref()
        .map(|s| normalize_text(s, SUMMARY_MAX_CHARS))
        .unwrap_or_default();
    let published_at = dates::parse_published(&raw.timestamps, &raw.date_strings);

    Some(Item {
        source: ctx.name.clone(),
        title,
        summary,
        link,
        published_at,
        method: ctx.method,
    })
}

/// Normalize a whole source batch. Returns (items, dropped_count).
pub fn normalize_batch(ctx: &SourceContext, raws: Vec<RawCandidate>) -> (Vec<Item>, usize) {
    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize(ctx, raw) {
            Some(item) => out.push(item),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(target: "ingest", source = %ctx.name, dropped, "candidates dropped in normalization");
    }
    (out, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FetchMethod;

    fn ctx(base: Option<&str>) -> SourceContext {
        SourceContext {
            name: "Smiles".into(),
            base_url: base.map(|b| Url::parse(b).unwrap()),
            method: FetchMethod::Scrape,
        }
    }

    #[test]
    fn normalize_text_collapses_ws_and_strips_tags() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b>!</p>  ";
        assert_eq!(normalize_text(s, 100), "Hello, world !");
    }

    #[test]
    fn script_and_style_bodies_are_dropped() {
        let s = "<style>.x{color:red}</style>Bônus <script>var a = 1;</script>100%";
        assert_eq!(normalize_text(s, 100), "Bônus 100%");
    }

    #[test]
    fn relative_link_resolves_against_base() {
        let base = Url::parse("https://www.smiles.com.br/promocoes").unwrap();
        assert_eq!(
            resolve_link("/promo/bonus-100", Some(&base)).as_deref(),
            Some("https://www.smiles.com.br/promo/bonus-100")
        );
        assert_eq!(resolve_link("/promo", None), None);
        assert_eq!(resolve_link("#top", Some(&base)), None);
        assert_eq!(resolve_link("javascript:void(0)", Some(&base)), None);
        assert_eq!(resolve_link("mailto:a@b.com", Some(&base)), None);
    }

    #[test]
    fn empty_title_or_link_is_dropped() {
        let c = ctx(Some("https://www.smiles.com.br/"));
        assert!(normalize(&c, RawCandidate::new("  <b> </b> ", "/x")).is_none());
        assert!(normalize(&c, RawCandidate::new("Bônus", "")).is_none());
        assert!(normalize(&c, RawCandidate::new("Bônus", "#")).is_none());
    }

    #[test]
    fn normalize_builds_item() {
        let c = ctx(Some("https://www.smiles.com.br/"));
        let raw = RawCandidate::new(" Bônus  de <em>100%</em> ", "promo/1")
            .with_summary("<p>Transfira pontos</p>")
            .with_date("2025-10-13T10:00:00Z");
        let it = normalize(&c, raw).unwrap();
        assert_eq!(it.title, "Bônus de 100%");
        assert_eq!(it.summary, "Transfira pontos");
        assert_eq!(it.link, "https://www.smiles.com.br/promo/1");
        assert_eq!(it.source, "Smiles");
        assert_eq!(it.method, FetchMethod::Scrape);
        assert!(it.published_at.is_some());
    }
}
