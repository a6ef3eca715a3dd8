// src/pipeline.rs
//! One run of the radar, as a fixed sequence of stages:
//! Init → Fetch → Normalize → Filter → Window → Dedupe → Rank → Deliver → Commit.
//!
//! The ledger snapshot is read once at Init and never re-read. Commit is the only
//! write and happens after delivery, so an aborted or crashed run re-discovers
//! its items next time (at-least-once).

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::RadarConfig;
use crate::dedup::dedupe;
use crate::error::RadarError;
use crate::ingest::normalize_batch;
use crate::ingest::types::{Item, RawCandidate, SourceAdapter, SourceContext};
use crate::ledger::LedgerStore;
use crate::metrics::ensure_metrics_described;
use crate::notify::{SinkOutcome, SinkSet};
use crate::rank::rank;
use crate::recency::RecencyWindow;
use crate::relevance::FilterEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Fetch,
    Normalize,
    Filter,
    Window,
    Dedupe,
    Rank,
    Deliver,
    Commit,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Filter => "filter",
            Stage::Window => "window",
            Stage::Dedupe => "dedupe",
            Stage::Rank => "rank",
            Stage::Deliver => "deliver",
            Stage::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When new ledger entries get written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit whether or not delivery worked.
    All,
    /// Commit only if the primary sink accepted the batch.
    #[default]
    DeliveredOnly,
}

/// Whether a run with these sink outcomes may commit.
pub fn should_commit(policy: CommitPolicy, outcomes: &[SinkOutcome]) -> bool {
    match policy {
        CommitPolicy::All => true,
        CommitPolicy::DeliveredOnly => outcomes.iter().any(|o| o.primary && o.is_ok()),
    }
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub workers: usize,
    pub fetch_timeout: Duration,
    pub commit: CommitPolicy,
    pub notify_when_empty: bool,
    /// Preview only: nothing is delivered or committed.
    pub dry_run: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            fetch_timeout: Duration::from_secs(20),
            commit: CommitPolicy::DeliveredOnly,
            notify_when_empty: false,
            dry_run: false,
        }
    }
}

impl RunSettings {
    pub fn from_config(cfg: &RadarConfig) -> Self {
        Self {
            workers: cfg.fetch.workers.max(1),
            fetch_timeout: Duration::from_secs(cfg.fetch.timeout_secs.max(1)),
            commit: cfg.ledger.commit,
            notify_when_empty: cfg.notify.notify_when_empty,
            dry_run: false,
        }
    }
}

#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub candidates: usize,
    pub items: usize,
    pub error: Option<RadarError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageCounts {
    pub candidates: usize,
    pub normalization_dropped: usize,
    pub filter_dropped: usize,
    pub window_dropped: usize,
    pub intra_run_dropped: usize,
    pub cross_run_dropped: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// Some source or sink failed; the rest of the run went through.
    Partial,
    /// Every source failed, or the commit write failed.
    Failed,
}

#[derive(Debug)]
pub struct RunReport {
    pub now: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub counts: StageCounts,
    pub sinks: Vec<SinkOutcome>,
    pub committed: usize,
    pub commit_error: Option<RadarError>,
    /// Final ranked batch.
    pub items: Vec<Item>,
}

impl RunReport {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            sources: Vec::new(),
            counts: StageCounts::default(),
            sinks: Vec::new(),
            committed: 0,
            commit_error: None,
            items: Vec::new(),
        }
    }

    pub fn status(&self) -> RunStatus {
        let all_sources_failed =
            !self.sources.is_empty() && self.sources.iter().all(|s| s.error.is_some());
        if self.commit_error.is_some() || all_sources_failed {
            return RunStatus::Failed;
        }
        let any_source_failed = self.sources.iter().any(|s| s.error.is_some());
        let any_sink_failed = self.sinks.iter().any(|s| !s.is_ok());
        if any_source_failed || any_sink_failed {
            RunStatus::Partial
        } else {
            RunStatus::Ok
        }
    }
}

pub struct Pipeline {
    adapters: Vec<Box<dyn SourceAdapter>>,
    filter: FilterEngine,
    window: RecencyWindow,
    ledger: Box<dyn LedgerStore>,
    sinks: SinkSet,
    settings: RunSettings,
    abort: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        filter: FilterEngine,
        window: RecencyWindow,
        ledger: Box<dyn LedgerStore>,
        sinks: SinkSet,
    ) -> Self {
        Self {
            adapters,
            filter,
            window,
            ledger,
            sinks,
            settings: RunSettings::default(),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share an external cancellation flag (e.g. raised by a Ctrl-C handler).
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = flag;
        self
    }

    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    fn checkpoint(&self, stage: Stage) -> Result<(), RadarError> {
        if self.abort.load(Ordering::SeqCst) {
            warn!(target: "radar", %stage, "abort requested; stopping run");
            return Err(RadarError::Aborted { stage });
        }
        Ok(())
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport, RadarError> {
        ensure_metrics_described();
        let mut report = RunReport::new(now);

        // Init
        self.checkpoint(Stage::Init)?;
        let snapshot = self.ledger.load_keys().await?;
        info!(target: "radar", sources = self.adapters.len(), ledger_keys = snapshot.len(), "run started");

        // Fetch
        self.checkpoint(Stage::Fetch)?;
        let fetched = self.fetch_all().await;

        // Normalize
        self.checkpoint(Stage::Normalize)?;
        let mut items: Vec<Item> = Vec::new();
        for (ctx, res) in fetched {
            match res {
                Ok(raws) => {
                    let n = raws.len();
                    let (batch, dropped) = normalize_batch(&ctx, raws);
                    report.counts.candidates += n;
                    report.counts.normalization_dropped += dropped;
                    report.sources.push(SourceReport {
                        name: ctx.name,
                        candidates: n,
                        items: batch.len(),
                        error: None,
                    });
                    items.extend(batch);
                }
                Err(e) => report.sources.push(SourceReport {
                    name: ctx.name,
                    candidates: 0,
                    items: 0,
                    error: Some(e),
                }),
            }
        }
        record_dropped(Stage::Normalize, report.counts.normalization_dropped);

        // Filter
        self.checkpoint(Stage::Filter)?;
        let before = items.len();
        items.retain(|it| {
            let verdict = self.filter.evaluate(it);
            if !verdict.is_accept() {
                debug!(target: "radar", source = %it.source, link = %it.link, reason = verdict.as_str(), "filtered out");
            }
            verdict.is_accept()
        });
        report.counts.filter_dropped = before - items.len();
        record_dropped(Stage::Filter, report.counts.filter_dropped);

        // Window
        self.checkpoint(Stage::Window)?;
        let before = items.len();
        items.retain(|it| self.window.contains(it, now));
        report.counts.window_dropped = before - items.len();
        record_dropped(Stage::Window, report.counts.window_dropped);

        // Dedupe
        self.checkpoint(Stage::Dedupe)?;
        let outcome = dedupe(items, &snapshot, now);
        report.counts.intra_run_dropped = outcome.intra_run_dropped;
        report.counts.cross_run_dropped = outcome.cross_run_dropped;
        record_dropped(
            Stage::Dedupe,
            outcome.intra_run_dropped + outcome.cross_run_dropped,
        );

        // Rank
        self.checkpoint(Stage::Rank)?;
        let ranked = rank(outcome.keep);
        report.counts.kept = ranked.len();
        counter!("radar_kept_total").increment(ranked.len() as u64);

        // Deliver
        self.checkpoint(Stage::Deliver)?;
        if self.settings.dry_run {
            info!(target: "radar", kept = ranked.len(), "dry run: skipping delivery and commit");
            report.items = ranked;
            return Ok(report);
        }
        if !ranked.is_empty() || self.settings.notify_when_empty {
            report.sinks = self.sinks.deliver_all(&ranked).await;
        } else {
            debug!(target: "radar", "nothing new; not notifying");
        }

        // Commit
        self.checkpoint(Stage::Commit)?;
        let entries = outcome.new_entries;
        if entries.is_empty() {
            debug!(target: "radar", "nothing to commit");
        } else if should_commit(self.settings.commit, &report.sinks) {
            match self.ledger.append(&entries).await {
                Ok(n) => {
                    report.committed = n;
                    counter!("radar_ledger_committed_total").increment(n as u64);
                }
                Err(e) => {
                    warn!(target: "radar", error = %e, "ledger commit failed; items will resurface next run");
                    report.commit_error = Some(e.into());
                }
            }
        } else {
            warn!(
                target: "radar",
                policy = ?self.settings.commit,
                primary = self.sinks.primary().unwrap_or("-"),
                pending = entries.len(),
                "primary sink did not accept the batch; not committing"
            );
        }

        gauge!("radar_last_run_ts").set(now.timestamp() as f64);
        info!(
            target: "radar",
            candidates = report.counts.candidates,
            kept = report.counts.kept,
            committed = report.committed,
            status = ?report.status(),
            "run finished"
        );
        report.items = ranked;
        Ok(report)
    }

    /// Fetch every source on a bounded pool; results come back in adapter order.
    async fn fetch_all(&self) -> Vec<(SourceContext, Result<Vec<RawCandidate>, RadarError>)> {
        let timeout = self.settings.fetch_timeout;
        let mut results: Vec<_> = stream::iter(self.adapters.iter().enumerate())
            .map(|(idx, adapter)| async move {
                let ctx = adapter.context();
                let t0 = Instant::now();
                let res = match tokio::time::timeout(timeout, adapter.fetch()).await {
                    Ok(Ok(raws)) => Ok(raws),
                    Ok(Err(e)) => Err(RadarError::SourceFetch {
                        source_name: ctx.name.clone(),
                        reason: format!("{e:#}"),
                    }),
                    Err(_) => Err(RadarError::SourceFetch {
                        source_name: ctx.name.clone(),
                        reason: format!("timed out after {}s", timeout.as_secs_f64()),
                    }),
                };
                histogram!("radar_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                match &res {
                    Ok(raws) => {
                        debug!(target: "radar", source = %ctx.name, candidates = raws.len(), "fetched")
                    }
                    Err(e) => {
                        counter!("radar_source_errors_total").increment(1);
                        warn!(target: "radar", source = %ctx.name, error = %e, "source failed; contributing nothing");
                    }
                }
                (idx, ctx, res)
            })
            .buffer_unordered(self.settings.workers.max(1))
            .collect()
            .await;

        results.sort_by_key(|(idx, _, _)| *idx);
        results.into_iter().map(|(_, ctx, res)| (ctx, res)).collect()
    }
}

fn record_dropped(stage: Stage, n: usize) {
    if n > 0 {
        counter!("radar_dropped_total", "stage" => stage.as_str()).increment(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(primary: bool, ok: bool) -> SinkOutcome {
        SinkOutcome {
            sink: "s".into(),
            primary,
            error: (!ok).then(|| RadarError::SinkDelivery {
                sink: "s".into(),
                reason: "down".into(),
            }),
        }
    }

    #[test]
    fn delivered_only_follows_the_primary() {
        let p = CommitPolicy::DeliveredOnly;
        assert!(should_commit(p, &[outcome(true, true), outcome(false, false)]));
        assert!(!should_commit(p, &[outcome(true, false), outcome(false, true)]));
        assert!(!should_commit(p, &[]));
        assert!(should_commit(CommitPolicy::All, &[]));
    }

    #[test]
    fn status_reflects_failures() {
        let mut r = RunReport::new(Utc::now());
        assert_eq!(r.status(), RunStatus::Ok);
        r.sources.push(SourceReport {
            name: "a".into(),
            candidates: 0,
            items: 0,
            error: Some(RadarError::SourceFetch {
                source_name: "a".into(),
                reason: "x".into(),
            }),
        });
        assert_eq!(r.status(), RunStatus::Failed);
        r.sources.push(SourceReport {
            name: "b".into(),
            candidates: 1,
            items: 1,
            error: None,
        });
        assert_eq!(r.status(), RunStatus::Partial);
    }
}
