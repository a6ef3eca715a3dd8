//! Recency window: keep items published within the last `horizon_days`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::Item;

/// What to do with items that carry no publish date.
///
/// Feeds almost always date their entries; page scans never do. Which default
/// is right depends on the deployment, so there is no implicit one in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndatedPolicy {
    /// Treat undated items as possibly recent.
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    pub horizon_days: u32,
    pub undated: UndatedPolicy,
}

impl RecencyWindow {
    pub fn new(horizon_days: u32, undated: UndatedPolicy) -> Self {
        Self {
            horizon_days,
            undated,
        }
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.horizon_days))
    }

    /// Oldest accepted publish time for a run at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.horizon()
    }

    pub fn contains(&self, item: &Item, now: DateTime<Utc>) -> bool {
        match item.published_at {
            None => self.undated == UndatedPolicy::Accept,
            // Inclusive at exactly horizon_days * 24h; future dates pass.
            Some(ts) => now.signed_duration_since(ts) <= self.horizon(),
        }
    }
}

pub fn is_within_window(
    item: &Item,
    now: DateTime<Utc>,
    horizon_days: u32,
    undated: UndatedPolicy,
) -> bool {
    RecencyWindow::new(horizon_days, undated).contains(item, now)
}
