// src/lib.rs
// Library surface shared by the binary and the integration tests.

pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod rank;
pub mod recency;
pub mod relevance;

// ---- Re-exports for stable public API ----
pub use crate::config::RadarConfig;
pub use crate::error::{LedgerError, RadarError};
pub use crate::ingest::types::{FetchMethod, Item, RawCandidate, SourceAdapter};
pub use crate::ledger::{JsonlLedger, LedgerEntry, LedgerKey, LedgerStore, MemoryLedger};
pub use crate::notify::{Notifier, SinkSet};
pub use crate::pipeline::{CommitPolicy, Pipeline, RunReport, RunSettings, RunStatus, Stage};
pub use crate::recency::{RecencyWindow, UndatedPolicy};
pub use crate::relevance::{FilterEngine, RuleSet};
