// src/metrics.rs
//! Run metrics. Without an installed recorder every macro is a no-op; the binary
//! installs the Prometheus recorder only when a textfile target is configured.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

pub const ENV_METRICS_FILE: &str = "PROMO_RADAR_METRICS_FILE";

/// One-time metric descriptions (so series carry HELP text in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("radar_candidates_total", "Raw candidates returned by adapters.");
        describe_counter!(
            "radar_dropped_total",
            "Items dropped, labelled by pipeline stage."
        );
        describe_counter!("radar_kept_total", "Items that reached the ranked digest.");
        describe_counter!(
            "radar_source_errors_total",
            "Source fetches that failed or timed out."
        );
        describe_counter!("radar_sink_errors_total", "Failed sink deliveries.");
        describe_counter!(
            "radar_ledger_committed_total",
            "Ledger entries appended at commit."
        );
        describe_histogram!("radar_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_histogram!("radar_parse_ms", "Per-source parse time in milliseconds.");
        describe_gauge!("radar_last_run_ts", "Unix ts when the last run finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the exposition text atomically (temp file + rename), textfile-collector style.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }
}
