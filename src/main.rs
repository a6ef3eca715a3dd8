//! promo-radar: one batch run over all configured sources.
//!
//! Fetch → filter → window → dedupe → rank → notify → commit, then exit.
//! Schedule it with cron or a systemd timer.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promo_radar::config::{self, RadarConfig};
use promo_radar::ingest::providers::build_adapters;
use promo_radar::metrics::{Metrics, ENV_METRICS_FILE};
use promo_radar::notify::{build_sinks, digest, DigestStyle, SinkSet};
use promo_radar::{FilterEngine, JsonlLedger, Pipeline, RunReport, RunSettings, RunStatus};

#[derive(Parser)]
#[command(name = "promo-radar")]
#[command(version, about = "Watch feeds and pages, send each matching post once", long_about = None)]
struct Cli {
    /// Config file (default: $PROMO_RADAR_CONFIG, then config/promo_radar.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the digest without notifying or touching the ledger
    #[arg(long)]
    dry_run: bool,

    /// Override window.horizon_days
    #[arg(long)]
    horizon_days: Option<u32>,

    /// Override ledger.path
    #[arg(long)]
    ledger: Option<PathBuf>,
}

/// Compact logs by default, JSON lines with PROMO_RADAR_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promo_radar=info,warn"));
    let json = std::env::var("PROMO_RADAR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(cli: &Cli) -> Result<RadarConfig> {
    let mut cfg = config::load_default(cli.config.as_deref())?;
    if let Some(h) = cli.horizon_days {
        cfg.window.horizon_days = h;
    }
    if let Some(p) = &cli.ledger {
        cfg.ledger.path = p.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(cli: Cli) -> Result<RunReport> {
    let cfg = resolve_config(&cli)?;

    let metrics = match std::env::var(ENV_METRICS_FILE) {
        Ok(p) => Some((Metrics::init()?, PathBuf::from(p))),
        Err(_) => None,
    };

    let filter = FilterEngine::new(&cfg.filter).context("compiling filter rules")?;
    let adapters = build_adapters(&cfg.sources, &cfg.fetch)?;
    let sinks = if cli.dry_run {
        SinkSet::new()
    } else {
        build_sinks(&cfg.notify, cfg.window.horizon_days)?
    };
    info!(
        sources = adapters.len(),
        sinks = ?sinks.names(),
        horizon_days = cfg.window.horizon_days,
        ledger = %cfg.ledger.path.display(),
        "configured"
    );

    let mut settings = RunSettings::from_config(&cfg);
    settings.dry_run = cli.dry_run;
    let pipeline = Pipeline::new(
        adapters,
        filter,
        cfg.window.recency(),
        Box::new(JsonlLedger::new(&cfg.ledger.path)),
        sinks,
    )
    .with_settings(settings);

    let abort = pipeline.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; aborting at the next stage boundary");
            abort.store(true, Ordering::SeqCst);
        }
    });

    let report = pipeline.run(Utc::now()).await?;

    if cli.dry_run {
        let style = DigestStyle::new(cfg.window.horizon_days, cfg.notify.display_offset_hours);
        println!("{}", digest::format_digest(&report.items, &style));
    }
    if let Some((m, path)) = metrics {
        if let Err(e) = m.write_textfile(&path) {
            warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present; real env vars win.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => match report.status() {
            RunStatus::Ok | RunStatus::Partial => ExitCode::SUCCESS,
            RunStatus::Failed if report.commit_error.is_some() => ExitCode::from(1),
            RunStatus::Failed => {
                error!("every source failed");
                ExitCode::from(2)
            }
        },
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            ExitCode::from(1)
        }
    }
}
