// src/dedup.rs
//! Two-level deduplication.
//!
//! Intra-run: items with the same normalized `(title, link)` collapse to the first.
//! Cross-run: items whose `(source, link)` is in the ledger snapshot are dropped,
//! and a key repeated within the batch counts as seen after its first occurrence.
//! Pure: the caller commits `new_entries` after delivery.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::ingest::types::Item;
use crate::ledger::{LedgerEntry, LedgerKey, LedgerSnapshot};

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub keep: Vec<Item>,
    /// Exactly one entry per kept item, same order.
    pub new_entries: Vec<LedgerEntry>,
    pub intra_run_dropped: usize,
    pub cross_run_dropped: usize,
}

/// Lowercased title with whitespace runs collapsed.
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn dedupe(items: Vec<Item>, snapshot: &LedgerSnapshot, now: DateTime<Utc>) -> DedupOutcome {
    let mut out = DedupOutcome::default();
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    let mut seen_keys: HashSet<LedgerKey> = HashSet::new();

    for item in items {
        if !seen_pairs.insert((title_key(&item.title), item.link.clone())) {
            out.intra_run_dropped += 1;
            continue;
        }
        let key = LedgerKey::of(&item);
        if snapshot.contains(&key) {
            out.cross_run_dropped += 1;
            continue;
        }
        if !seen_keys.insert(key) {
            out.intra_run_dropped += 1;
            continue;
        }
        out.new_entries.push(LedgerEntry::for_item(&item, now));
        out.keep.push(item);
    }

    tracing::debug!(
        target: "radar",
        kept = out.keep.len(),
        intra = out.intra_run_dropped,
        cross = out.cross_run_dropped,
        "dedup done"
    );
    out
}
