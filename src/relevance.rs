// src/relevance.rs
//! Relevance gate: domain exclusion, negative patterns, positive patterns.
//!
//! One declarative `RuleSet` (from TOML or the built-in seed) compiles into a
//! `FilterEngine`. Keywords are case-insensitive substrings; patterns are full
//! regexes (use inline `(?i)` for case-insensitivity). Evaluation short-circuits:
//! excluded domain → negative match → missing positive match → accept.

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ingest::types::Item;

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Case-insensitive substrings; any hit counts as a positive match.
    pub keywords: Vec<String>,
    /// Regexes; any hit counts as a positive match.
    pub patterns: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub negative_patterns: Vec<String>,
    /// Hosts to reject, including all of their subdomains.
    pub excluded_domains: Vec<String>,
}

impl RuleSet {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Built-in seed: miles-transfer bonus campaigns from Brazilian loyalty programs.
    pub fn transfer_bonus() -> Self {
        let keywords = [
            "transferência",
            "transferencia",
            "transferir",
            "bônus",
            "bonus",
            "bonificação",
            "bonificacao",
            "campanha",
            "promoção",
            "promocao",
            "promo",
        ];
        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            // Short program names need word boundaries ("ame" in "game", "inter" in "internet")
            patterns: vec![
                r"(?i)\b(smiles|latam pass|esfera|livelo|tudoazul|ame|inter|santander|bradesco|ita[uú]|bb|caixa|shell box)\b"
                    .to_string(),
            ],
            ..Self::default()
        }
    }

    pub fn has_positive(&self) -> bool {
        self.keywords.iter().any(|k| !k.trim().is_empty())
            || self.patterns.iter().any(|p| !p.trim().is_empty())
    }
}

/* ----------------------------
Compiled engine structures
---------------------------- */

/// Unified matcher over fixed keywords and regexes.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Lowercased needle, matched against lowercased text.
    Keyword(String),
    Regex(Regex),
}

impl Pattern {
    /// `None` for blank keywords.
    pub fn keyword(k: &str) -> Option<Self> {
        let k = k.trim();
        (!k.is_empty()).then(|| Pattern::Keyword(k.to_lowercase()))
    }

    pub fn regex(p: &str) -> Result<Self> {
        Regex::new(p)
            .map(Pattern::Regex)
            .map_err(|e| anyhow!("pattern `{}` regex error: {}", p, e))
    }

    /// `lowered` must be `text.to_lowercase()`; passed in so it is computed once per item.
    pub fn is_match(&self, text: &str, lowered: &str) -> bool {
        match self {
            Pattern::Keyword(k) => lowered.contains(k.as_str()),
            Pattern::Regex(re) => re.is_match(text),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Keyword(k) => k,
            Pattern::Regex(re) => re.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    ExcludedDomain,
    NegativeMatch,
    NoPositiveMatch,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        self == Verdict::Accept
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::ExcludedDomain => "excluded_domain",
            Verdict::NegativeMatch => "negative_match",
            Verdict::NoPositiveMatch => "no_positive_match",
        }
    }
}

/// The engine holds compiled patterns and normalized domains.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    positive: Vec<Pattern>,
    negative: Vec<Pattern>,
    excluded_domains: Vec<String>,
}

impl FilterEngine {
    pub fn new(rules: &RuleSet) -> Result<Self> {
        if !rules.has_positive() {
            bail!("rule set has no positive keywords or patterns; nothing could ever match");
        }
        let positive = compile(&rules.keywords, &rules.patterns)?;
        let negative = compile(&rules.negative_keywords, &rules.negative_patterns)?;
        let excluded_domains = rules
            .excluded_domains
            .iter()
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty())
            .collect();
        Ok(Self {
            positive,
            negative,
            excluded_domains,
        })
    }

    pub fn evaluate(&self, item: &Item) -> Verdict {
        // 1) Domain exclusion is host-scoped: text mentions of a brand don't count
        if let Some(host) = host_of(&item.link) {
            if self
                .excluded_domains
                .iter()
                .any(|d| domain_matches(&host, d))
            {
                return Verdict::ExcludedDomain;
            }
        }

        let text = item.match_text();
        let lowered = text.to_lowercase();

        // 2) Negative patterns
        if self.negative.iter().any(|p| p.is_match(&text, &lowered)) {
            return Verdict::NegativeMatch;
        }

        // 3) Positive patterns
        if !self.positive.iter().any(|p| p.is_match(&text, &lowered)) {
            return Verdict::NoPositiveMatch;
        }

        Verdict::Accept
    }

    pub fn is_relevant(&self, item: &Item) -> bool {
        self.evaluate(item).is_accept()
    }

    /// First positive pattern hitting `text`, for diagnostics.
    pub fn first_positive_hit(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.positive
            .iter()
            .find(|p| p.is_match(text, &lowered))
            .map(Pattern::as_str)
    }
}

/// Free-function form of [`FilterEngine::is_relevant`].
pub fn is_relevant(item: &Item, engine: &FilterEngine) -> bool {
    engine.is_relevant(item)
}

fn compile(keywords: &[String], patterns: &[String]) -> Result<Vec<Pattern>> {
    let mut out: Vec<Pattern> = keywords.iter().filter_map(|k| Pattern::keyword(k)).collect();
    for p in patterns.iter().filter(|p| !p.trim().is_empty()) {
        out.push(Pattern::regex(p)?);
    }
    Ok(out)
}

/// Lowercase, trimmed, without leading `*.`/`.` or trailing dots.
fn normalize_domain(d: &str) -> String {
    d.trim()
        .trim_start_matches("*.")
        .trim_matches('.')
        .to_ascii_lowercase()
}

/// Host of an absolute URL, lowercased and without a trailing dot.
pub fn host_of(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?;
    Some(host.trim_end_matches('.').to_ascii_lowercase())
}

/// Host `h` matches domain `d` iff `h == d` or `h` ends with `"." + d`.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/* ----------------------------
Tests
---------------------------- */
