//! Report builder: one canonical aggregate, several serializers.
//!
//! A [`Report`] takes ownership of both rosters and the [`DiffResult`],
//! computes every aggregate once and is then rendered by independent,
//! side-effect-free serializers:
//!
//! - [`Report::to_text`] - human-readable report ([`text`])
//! - [`Report::to_json`] - JSON document ([`json`])
//! - [`Report::write_exports`] - per-category CSV files ([`export`])
//! - [`Report::snapshot`] - serde snapshot for persistence sinks
//!
//! The detail limit only shortens itemized lists; aggregate counts are never
//! truncated.

pub mod export;
pub mod json;
pub mod text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::diff::DiffResult;
use crate::models::{FieldCount, Roster};
use crate::normalize::{KeyNormalize, ValueNormalize};

pub use export::ExportOptions;

/// Configuration echoed by every rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub key_columns: Vec<String>,
    pub key_normalize: KeyNormalize,
    pub value_normalize: ValueNormalize,
    pub ignored_fields: BTreeSet<String>,
    /// Maximum itemized entries per category; 0 means unlimited.
    pub detail_limit: usize,
    pub summary_only: bool,
}

/// Aggregate counts and ratios. Percentages are `None` when the
/// denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_previous: usize,
    pub total_current: usize,
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub duplicate_keys_previous: usize,
    pub duplicate_keys_current: usize,
    pub invalid_rows_previous: usize,
    pub invalid_rows_current: usize,
    pub net_change: i64,
    pub net_change_pct_previous: Option<f64>,
    pub added_pct_current: Option<f64>,
    pub removed_pct_previous: Option<f64>,
    pub updated_pct_shared: Option<f64>,
    pub unchanged_pct_shared: Option<f64>,
}

/// Share of non-empty values for one header field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCompleteness {
    pub field: String,
    pub non_empty: usize,
    pub total: usize,
    pub pct: Option<f64>,
}

/// Read-only copy of every aggregate used in rendering, for sinks that
/// persist runs without recomputing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub summary: Summary,
    pub field_change_counts: Vec<FieldCount>,
    pub missing_key_counts_previous: Vec<FieldCount>,
    pub missing_key_counts_current: Vec<FieldCount>,
    pub completeness_previous: Vec<FieldCompleteness>,
    pub completeness_current: Vec<FieldCompleteness>,
}

/// Finalized reconciliation report.
#[derive(Debug, Clone)]
pub struct Report {
    previous: Roster,
    current: Roster,
    diff: DiffResult,
    config: ReportConfig,
    summary: Summary,
    field_change_counts: Vec<FieldCount>,
    missing_key_counts_previous: Vec<FieldCount>,
    missing_key_counts_current: Vec<FieldCount>,
    completeness_previous: Vec<FieldCompleteness>,
    completeness_current: Vec<FieldCompleteness>,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(previous: Roster, current: Roster, diff: DiffResult, config: ReportConfig) -> Self {
        let summary = summarize(&previous, &current, &diff);
        let field_change_counts = sort_counts(&diff.field_change_counts);
        let missing_key_counts_previous = sort_counts(previous.missing_key_counts());
        let missing_key_counts_current = sort_counts(current.missing_key_counts());
        let completeness_previous = field_completeness(&previous);
        let completeness_current = field_completeness(&current);

        Self {
            previous,
            current,
            diff,
            config,
            summary,
            field_change_counts,
            missing_key_counts_previous,
            missing_key_counts_current,
            completeness_previous,
            completeness_current,
            generated_at: Utc::now(),
        }
    }

    /// Pin the generation timestamp (for reproducible output).
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    pub fn previous(&self) -> &Roster {
        &self.previous
    }

    pub fn current(&self) -> &Roster {
        &self.current
    }

    pub fn diff(&self) -> &DiffResult {
        &self.diff
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Field change counts, highest first; ties keep first-seen order.
    pub fn field_change_counts(&self) -> &[FieldCount] {
        &self.field_change_counts
    }

    /// Blank key values per key column, highest first.
    pub fn missing_key_counts_previous(&self) -> &[FieldCount] {
        &self.missing_key_counts_previous
    }

    pub fn missing_key_counts_current(&self) -> &[FieldCount] {
        &self.missing_key_counts_current
    }

    pub fn completeness_previous(&self) -> &[FieldCompleteness] {
        &self.completeness_previous
    }

    pub fn completeness_current(&self) -> &[FieldCompleteness] {
        &self.completeness_current
    }

    /// Number of entries shown for a category of `total` items.
    pub fn shown(&self, total: usize) -> usize {
        match self.config.detail_limit {
            0 => total,
            limit => total.min(limit),
        }
    }

    pub fn is_truncated(&self, total: usize) -> bool {
        self.config.detail_limit > 0 && total > self.config.detail_limit
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        ReportSnapshot {
            summary: self.summary.clone(),
            field_change_counts: self.field_change_counts.clone(),
            missing_key_counts_previous: self.missing_key_counts_previous.clone(),
            missing_key_counts_current: self.missing_key_counts_current.clone(),
            completeness_previous: self.completeness_previous.clone(),
            completeness_current: self.completeness_current.clone(),
        }
    }
}

/// `numerator / denominator * 100`, or `None` for a zero denominator.
pub fn percent(numerator: i64, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64 * 100.0)
    }
}

fn summarize(previous: &Roster, current: &Roster, diff: &DiffResult) -> Summary {
    let total_previous = previous.len();
    let total_current = current.len();
    let shared = diff.shared_count();
    let net_change = total_current as i64 - total_previous as i64;

    Summary {
        total_previous,
        total_current,
        added: diff.added.len(),
        removed: diff.removed.len(),
        updated: diff.updates.len(),
        unchanged: diff.unchanged.len(),
        duplicate_keys_previous: previous.duplicate_count(),
        duplicate_keys_current: current.duplicate_count(),
        invalid_rows_previous: previous.invalid_count(),
        invalid_rows_current: current.invalid_count(),
        net_change,
        net_change_pct_previous: percent(net_change, total_previous),
        added_pct_current: percent(diff.added.len() as i64, total_current),
        removed_pct_previous: percent(diff.removed.len() as i64, total_previous),
        updated_pct_shared: percent(diff.updates.len() as i64, shared),
        unchanged_pct_shared: percent(diff.unchanged.len() as i64, shared),
    }
}

/// Highest count first; the sort is stable so ties keep their input order.
fn sort_counts(counts: &[FieldCount]) -> Vec<FieldCount> {
    let mut sorted = counts.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted
}

/// Completeness per header field, least complete first, ties alphabetical.
pub fn field_completeness(roster: &Roster) -> Vec<FieldCompleteness> {
    let total = roster.total_rows();
    let mut fields: Vec<FieldCompleteness> = roster
        .header()
        .iter()
        .map(|field| {
            let non_empty = roster.non_empty_count(field);
            FieldCompleteness {
                field: field.clone(),
                non_empty,
                total,
                pct: percent(non_empty as i64, total),
            }
        })
        .collect();

    fields.sort_by(|a, b| {
        let ratio_a = a.pct.unwrap_or(f64::INFINITY);
        let ratio_b = b.pct.unwrap_or(f64::INFINITY);
        ratio_a
            .partial_cmp(&ratio_b)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.field.cmp(&b.field))
    });
    fields
}
