// src/ingest/dates.rs
//! Publish-date parsing for raw candidates.
//!
//! Structured unix timestamps win over free-text strings. Strings are tried in the
//! order the adapter supplied them, each against RFC 2822, RFC 3339 and a few
//! zone-less layouts (read as UTC). Anything unparseable yields `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime,
};

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

pub fn parse_published(timestamps: &[i64], date_strings: &[String]) -> Option<DateTime<Utc>> {
    timestamps
        .iter()
        .find_map(|&ts| from_unix(ts))
        .or_else(|| date_strings.iter().find_map(|s| parse_date_str(s)))
}

/// Parse one free-text date. Zone-less values are taken as UTC.
pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_rfc2822(s)
        .or_else(|| parse_rfc3339(s))
        .or_else(|| parse_rfc2822_named_zone(s))
        .or_else(|| parse_naive(s))
}

// 0 and negatives mean "no date" for every feed we have seen.
fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts <= 0 {
        return None;
    }
    DateTime::from_timestamp(ts, 0)
}

fn offset_to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(s, &Rfc2822)
        .ok()
        .and_then(offset_to_utc)
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(s, &Rfc3339)
        .ok()
        .and_then(offset_to_utc)
}

/// chrono accepts the obsolete zone names (GMT, EST, ...) that some feeds still emit.
fn parse_rfc2822_named_zone(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(s: &str) -> Option<DateTime<Utc>> {
    for layout in NAIVE_LAYOUTS {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}
