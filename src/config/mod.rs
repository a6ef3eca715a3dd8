// src/config/mod.rs
//! Run configuration: one TOML file, resolved like this:
//! 1) explicit path (`--config`)
//! 2) $PROMO_RADAR_CONFIG
//! 3) config/promo_radar.toml
//! 4) built-in defaults (original source list + transfer-bonus rules)
//!
//! Sink credentials never live here; they come from the environment.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::RadarError;
use crate::pipeline::CommitPolicy;
use crate::recency::{RecencyWindow, UndatedPolicy};
use crate::relevance::{FilterEngine, RuleSet};

pub const ENV_CONFIG_PATH: &str = "PROMO_RADAR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/promo_radar.toml";

/// Sink names accepted by `notify.primary`, in default-primary order.
pub const SINK_NAMES: [&str; 4] = ["email", "telegram", "discord", "console"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub window: WindowSettings,
    pub filter: RuleSet,
    pub fetch: FetchSettings,
    pub sources: Vec<SourceConfig>,
    pub ledger: LedgerSettings,
    pub notify: NotifySettings,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            filter: RuleSet::transfer_bonus(),
            fetch: FetchSettings::default(),
            sources: default_sources(),
            ledger: LedgerSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub horizon_days: u32,
    pub undated: UndatedPolicy,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            horizon_days: 3,
            undated: UndatedPolicy::Accept,
        }
    }
}

impl WindowSettings {
    pub fn recency(&self) -> RecencyWindow {
        RecencyWindow::new(self.horizon_days, self.undated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Upper bound on concurrent source fetches.
    pub workers: usize,
    /// Per-fetch timeout; applies to the HTTP client and to the whole adapter call.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_secs: 20,
            user_agent: "Mozilla/5.0 (compatible; PromoRadar/0.1)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    /// Base for relative links; defaults to `url` for page scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SourceConfig {
    pub fn feed(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: SourceKind::Feed,
            url: url.to_string(),
            base_url: None,
        }
    }

    pub fn page(name: &str, url: &str) -> Self {
        Self {
            kind: SourceKind::Page,
            ..Self::feed(name, url)
        }
    }

    pub fn parsed_url(&self) -> Result<Url> {
        parse_http_url(&self.url).with_context(|| format!("source `{}` url", self.name))
    }

    pub fn parsed_base_url(&self) -> Result<Option<Url>> {
        self.base_url
            .as_deref()
            .map(|b| parse_http_url(b).with_context(|| format!("source `{}` base_url", self.name)))
            .transpose()
    }
}

fn parse_http_url(s: &str) -> Result<Url> {
    let url = Url::parse(s.trim()).map_err(|e| anyhow!("`{s}` is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("`{s}` has unsupported scheme `{other}`"),
    }
}

/// The sources the original monitor watched.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::feed("Passageiro de Primeira", "https://passageirodeprimeira.com/feed/"),
        SourceConfig::feed("Melhores Destinos", "https://www.melhoresdestinos.com.br/feed"),
        SourceConfig::feed("Pontos pra Voar", "https://www.pontospravoar.com/feed"),
        SourceConfig::feed("Império das Milhas (geral)", "https://imperiodasmilhas.com/feed/"),
        SourceConfig::feed(
            "Império das Milhas (promoções)",
            "https://imperiodasmilhas.com/categoria/promocoes/feed/",
        ),
        SourceConfig::page("Smiles - Promoções", "https://www.smiles.com.br/promocoes"),
        SourceConfig::page(
            "LATAM Pass - Promoções",
            "https://latampass.latam.com/pt_br/promocoes",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub path: PathBuf,
    pub commit: CommitPolicy,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state/ledger.jsonl"),
            commit: CommitPolicy::DeliveredOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Sink whose success gates a `delivered_only` commit.
    pub primary: Option<String>,
    pub notify_when_empty: bool,
    /// Hours east of UTC used when printing dates in digests.
    pub display_offset_hours: i32,
    pub console: bool,
    pub email: bool,
    pub telegram: bool,
    pub discord: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            primary: None,
            notify_when_empty: false,
            display_offset_hours: -3,
            console: true,
            email: false,
            telegram: false,
            discord: false,
        }
    }
}

impl NotifySettings {
    pub fn is_enabled(&self, sink: &str) -> bool {
        match sink {
            "email" => self.email,
            "telegram" => self.telegram,
            "discord" => self.discord,
            "console" => self.console,
            _ => false,
        }
    }

    /// Enabled sink names in default-primary order.
    pub fn enabled(&self) -> Vec<&'static str> {
        SINK_NAMES
            .iter()
            .copied()
            .filter(|s| self.is_enabled(s))
            .collect()
    }

    /// Explicit primary, else the first enabled sink.
    pub fn primary_sink(&self) -> Option<&str> {
        match self.primary.as_deref() {
            Some(p) => Some(p),
            None => self.enabled().first().copied(),
        }
    }
}

impl RadarConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RadarConfig = toml::from_str(s).context("parsing radar config TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), RadarError> {
        if self.fetch.workers == 0 {
            return Err(RadarError::config("fetch.workers must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(RadarError::config("fetch.timeout_secs must be at least 1"));
        }
        if !(-23..=23).contains(&self.notify.display_offset_hours) {
            return Err(RadarError::config(
                "notify.display_offset_hours must be within -23..=23",
            ));
        }

        let mut names = HashSet::new();
        for s in &self.sources {
            let name = s.name.trim();
            if name.is_empty() {
                return Err(RadarError::config("source with empty name"));
            }
            if !names.insert(name) {
                return Err(RadarError::config(format!("duplicate source name `{name}`")));
            }
            s.parsed_url().map_err(|e| RadarError::config(format!("{e:#}")))?;
            s.parsed_base_url()
                .map_err(|e| RadarError::config(format!("{e:#}")))?;
        }

        if let Some(p) = self.notify.primary.as_deref() {
            if !SINK_NAMES.contains(&p) {
                return Err(RadarError::config(format!("unknown primary sink `{p}`")));
            }
            if !self.notify.is_enabled(p) {
                return Err(RadarError::config(format!(
                    "primary sink `{p}` is not enabled"
                )));
            }
        }

        FilterEngine::new(&self.filter).map_err(|e| RadarError::config(format!("filter: {e}")))?;
        Ok(())
    }
}

/// Load and validate config from an explicit path.
pub fn load_from(path: &Path) -> Result<RadarConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading radar config from {}", path.display()))?;
    RadarConfig::from_toml_str(&content).with_context(|| format!("config {}", path.display()))
}

/// Resolve config using the CLI path, then env, then the default file, then built-ins.
pub fn load_default(cli_path: Option<&Path>) -> Result<RadarConfig> {
    if let Some(p) = cli_path {
        return load_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_from(&default_p);
    }
    tracing::info!(target: "radar", "no config file found; using built-in defaults");
    Ok(RadarConfig::default())
}
