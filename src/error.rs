// src/error.rs
//! Error taxonomy for a run.
//!
//! Source and sink failures are recorded in the run report and never abort the
//! run. Ledger failures are the only ones that can leave a run without a commit.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ledger entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RadarError {
    /// One adapter failed or timed out; it contributes zero items.
    #[error("source `{source_name}` failed: {reason}")]
    SourceFetch { source_name: String, reason: String },

    /// One notification channel failed; other sinks still run.
    #[error("sink `{sink}` failed: {reason}")]
    SinkDelivery { sink: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("run aborted before stage {stage}")]
    Aborted { stage: Stage },
}

impl RadarError {
    pub fn config(msg: impl std::fmt::Display) -> Self {
        RadarError::Config(msg.to_string())
    }
}
