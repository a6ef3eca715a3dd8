// src/ledger.rs
//! Seen-items ledger: the durable `(source, link)` set behind cross-run dedup.
//!
//! The snapshot is read once at run start; new entries are appended once at
//! commit. Appends are idempotent: keys already present are skipped, and an
//! empty append is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::LedgerError;
use crate::ingest::types::{FetchMethod, Item};

/// Composite identity: "this exact item from this exact source was shown".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    pub source: String,
    pub link: String,
}

impl LedgerKey {
    pub fn new(source: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            link: link.into(),
        }
    }

    pub fn of(item: &Item) -> Self {
        Self::new(item.source.clone(), item.link.clone())
    }
}

pub type LedgerSnapshot = HashSet<LedgerKey>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub source: String,
    pub link: String,
    pub first_seen_at: DateTime<Utc>,
    // Audit-only fields below; identity is (source, link).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<FetchMethod>,
}

impl LedgerEntry {
    pub fn for_item(item: &Item, now: DateTime<Utc>) -> Self {
        Self {
            source: item.source.clone(),
            link: item.link.clone(),
            first_seen_at: now,
            title: Some(item.title.clone()),
            published_at: item.published_at,
            method: Some(item.method),
        }
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.source.clone(), self.link.clone())
    }
}

#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_keys(&self) -> Result<LedgerSnapshot, LedgerError>;

    /// Append entries whose key is not stored yet. Returns how many were written.
    async fn append(&self, entries: &[LedgerEntry]) -> Result<usize, LedgerError>;
}

#[async_trait::async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    async fn load_keys(&self) -> Result<LedgerSnapshot, LedgerError> {
        (**self).load_keys().await
    }

    async fn append(&self, entries: &[LedgerEntry]) -> Result<usize, LedgerError> {
        (**self).append(entries).await
    }
}

/// Drop entries already in `existing` (and repeats within `entries`).
fn fresh_entries<'a>(
    entries: &'a [LedgerEntry],
    existing: &LedgerSnapshot,
) -> Vec<&'a LedgerEntry> {
    let mut batch_keys = HashSet::new();
    entries
        .iter()
        .filter(|e| {
            let k = e.key();
            !existing.contains(&k) && batch_keys.insert(k)
        })
        .collect()
}

/* ----------------------------
JSON-lines file store
---------------------------- */

/// One JSON object per line. Doubles as an audit log of everything ever notified.
#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Every decodable entry in file order. A missing file is an empty ledger.
    pub async fn read_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        let mut out = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEntry>(line) {
                Ok(e) => out.push(e),
                // A torn last line from an interrupted write must not block every future run.
                Err(err) => tracing::warn!(
                    target: "radar",
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %err,
                    "skipping undecodable ledger line"
                ),
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonlLedger {
    async fn load_keys(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self
            .read_entries()
            .await?
            .iter()
            .map(LedgerEntry::key)
            .collect())
    }

    async fn append(&self, entries: &[LedgerEntry]) -> Result<usize, LedgerError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let existing = self.load_keys().await?;
        let fresh = fresh_entries(entries, &existing);
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut buf = String::new();
        for e in &fresh {
            buf.push_str(&serde_json::to_string(e)?);
            buf.push('\n');
        }

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|e| self.io_err(e))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        // Single write so an abort leaves at most one torn line.
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;
        file.sync_data().await.map_err(|e| self.io_err(e))?;

        Ok(fresh.len())
    }
}

/* ----------------------------
In-memory store
---------------------------- */

/// Process-local ledger for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedger {
    async fn load_keys(&self) -> Result<LedgerSnapshot, LedgerError> {
        Ok(self.entries().iter().map(LedgerEntry::key).collect())
    }

    async fn append(&self, entries: &[LedgerEntry]) -> Result<usize, LedgerError> {
        let mut guard = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let existing: LedgerSnapshot = guard.iter().map(LedgerEntry::key).collect();
        let fresh: Vec<LedgerEntry> = fresh_entries(entries, &existing)
            .into_iter()
            .cloned()
            .collect();
        let n = fresh.len();
        guard.extend(fresh);
        Ok(n)
    }
}
