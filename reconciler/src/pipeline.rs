//! High-level pipeline API: load both snapshots, reconcile, build the report.
//!
//! # Example
//!
//! ```rust,ignore
//! use roster_reconciler::pipeline::{reconcile_files, ReconcileOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = reconcile_files(
//!         Path::new("previous.csv"),
//!         Path::new("current.csv"),
//!         &ReconcileOptions::default(),
//!     ).await?;
//!
//!     println!("{}", report.to_text());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::diff::reconcile;
use crate::error::{ReconcileError, ReconcileResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::models::Roster;
use crate::normalize::{KeyNormalize, ValueNormalize};
use crate::parser::load;
use crate::report::{Report, ReportConfig};
use crate::validation::{validate_key_columns, DEFAULT_KEY_COLUMN};

/// Options for a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Ordered key columns forming the composite key
    pub key_columns: Vec<String>,

    pub key_normalize: KeyNormalize,

    pub value_normalize: ValueNormalize,

    /// Fields excluded from change detection
    pub ignored_fields: BTreeSet<String>,

    /// Maximum itemized entries per category (0 = unlimited)
    pub detail_limit: usize,

    /// Render aggregates only
    pub summary_only: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key_columns: vec![DEFAULT_KEY_COLUMN.to_string()],
            key_normalize: KeyNormalize::None,
            value_normalize: ValueNormalize::None,
            ignored_fields: BTreeSet::new(),
            detail_limit: 0,
            summary_only: false,
        }
    }
}

impl ReconcileOptions {
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            key_columns: self.key_columns.clone(),
            key_normalize: self.key_normalize,
            value_normalize: self.value_normalize,
            ignored_fields: self.ignored_fields.clone(),
            detail_limit: self.detail_limit,
            summary_only: self.summary_only,
        }
    }
}

/// Load both files concurrently and reconcile them.
///
/// Each file is parsed on the blocking pool; both loads are joined before
/// diffing. The first load error (previous side checked first) aborts the run.
pub async fn reconcile_files(
    previous: &Path,
    current: &Path,
    options: &ReconcileOptions,
) -> ReconcileResult<Report> {
    validate_key_columns(&options.key_columns)?;

    log_info(format!(
        "Loading {} and {}",
        previous.display(),
        current.display()
    ));

    let prev_task = spawn_load(previous.to_path_buf(), options);
    let cur_task = spawn_load(current.to_path_buf(), options);
    let (prev_joined, cur_joined) = tokio::join!(prev_task, cur_task);

    let previous = prev_joined.map_err(|e| ReconcileError::Task(e.to_string()))??;
    let current = cur_joined.map_err(|e| ReconcileError::Task(e.to_string()))??;

    Ok(reconcile_rosters(previous, current, options))
}

fn spawn_load(
    path: PathBuf,
    options: &ReconcileOptions,
) -> tokio::task::JoinHandle<crate::error::LoadResult<Roster>> {
    let key_columns = options.key_columns.clone();
    let key_normalize = options.key_normalize;
    tokio::task::spawn_blocking(move || load(&path, &key_columns, key_normalize))
}

/// Reconcile two already-loaded rosters and build the report.
pub fn reconcile_rosters(previous: Roster, current: Roster, options: &ReconcileOptions) -> Report {
    log_roster_stats("previous", &previous);
    log_roster_stats("current", &current);

    let diff = reconcile(
        &previous,
        &current,
        &options.ignored_fields,
        options.value_normalize,
    );

    if !diff.unknown_ignored_fields.is_empty() {
        log_warning(format!(
            "Ignored field(s) not present in either file: {}",
            diff.unknown_ignored_fields.join(", ")
        ));
    }

    log_success(format!(
        "Reconciled: {} added, {} removed, {} updated, {} unchanged",
        diff.added.len(),
        diff.removed.len(),
        diff.updates.len(),
        diff.unchanged.len()
    ));

    Report::new(previous, current, diff, options.report_config())
}

fn log_roster_stats(label: &str, roster: &Roster) {
    log_info_indent(
        format!(
            "{}: {} rows, {} keyed, {} fields",
            label,
            roster.total_rows(),
            roster.len(),
            roster.header().len()
        ),
        1,
    );
    if roster.duplicate_count() > 0 {
        log_warning_indent(
            format!(
                "{}: {} duplicate key(s) dropped, first occurrence kept",
                label,
                roster.duplicate_count()
            ),
            1,
        );
    }
    if roster.invalid_count() > 0 {
        log_warning_indent(
            format!("{}: {} row(s) missing key values", label, roster.invalid_count()),
            1,
        );
    }
}
