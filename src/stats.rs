use std::iter::Sum;
use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters produced by single-feed pruning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSummary {
    pub total_entities: usize,
    pub kept_entities: usize,
    // stop ids compared against the prefix (trip updates and alerts only)
    pub total_stop_refs_checked: usize,
    pub kept_stop_refs: usize,
}

impl FilterSummary {
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn kept_entities_pct(&self) -> f64 {
        Self::pct(self.kept_entities, self.total_entities)
    }

    pub fn kept_stop_refs_pct(&self) -> f64 {
        Self::pct(self.kept_stop_refs, self.total_stop_refs_checked)
    }
}

impl AddAssign for FilterSummary {
    fn add_assign(&mut self, other: Self) {
        self.total_entities += other.total_entities;
        self.kept_entities += other.kept_entities;
        self.total_stop_refs_checked += other.total_stop_refs_checked;
        self.kept_stop_refs += other.kept_stop_refs;
    }
}

impl Sum for FilterSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(FilterSummary::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

/// The `summary` block of a filtered-feed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(flatten)]
    pub totals: FilterSummary,
    pub prefix: String,
    /// Source URL with credentials redacted.
    pub source: String,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(totals: FilterSummary, prefix: &str, source: &str, generated_at: DateTime<Utc>) -> Self {
        Self {
            totals,
            prefix: prefix.to_string(),
            source: crate::redact::redact_url(source),
            generated_at,
        }
    }
}
