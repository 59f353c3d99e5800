//! Run Ledger - persist reconciliation runs
//!
//! Every logged run is stored as one pretty JSON file (`<id>.json`) holding
//! the run metadata and the [`ReportSnapshot`], so past runs can be listed
//! and inspected without re-reading the input files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{ConfigResult, LedgerError, LedgerResult};
use crate::pipeline::ReconcileOptions;
use crate::report::{Report, ReportSnapshot};
use crate::validation::validate_app_name;

/// Directory where runs are stored (relative to current dir)
pub const DEFAULT_LEDGER_DIR: &str = ".roster-reconciler/runs";

/// App name recorded when none is given.
pub const DEFAULT_APP_NAME: &str = "roster_reconciler";

/// A stored run with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Application label
    pub app: String,
    pub previous: PathBuf,
    pub current: PathBuf,
    pub options: ReconcileOptions,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    /// Every aggregate of the report
    pub snapshot: ReportSnapshot,
}

impl RunRecord {
    /// Capture a finished run. Fails if `app` is not a valid label.
    pub fn new(
        app: &str,
        options: &ReconcileOptions,
        report: &Report,
        started_at: DateTime<Utc>,
    ) -> ConfigResult<Self> {
        validate_app_name(app)?;

        let finished_at = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            app: app.to_string(),
            previous: report.previous().source().to_path_buf(),
            current: report.current().source().to_path_buf(),
            options: options.clone(),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
            snapshot: report.snapshot(),
        })
    }
}

/// Destination for finished runs.
pub trait RunSink {
    /// Store `record`, returning its identifier.
    fn persist(&mut self, record: &RunRecord) -> LedgerResult<String>;
}

/// File-backed store of run records
pub struct RunLedger {
    /// Directory where runs are stored
    ledger_dir: PathBuf,
    /// Loaded runs (id -> record)
    runs: HashMap<String, RunRecord>,
}

impl RunLedger {
    /// Open the ledger in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_LEDGER_DIR)
    }

    /// Open a ledger with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut ledger = Self {
            ledger_dir: dir.as_ref().to_path_buf(),
            runs: HashMap::new(),
        };
        ledger.load_all();
        ledger
    }

    pub fn dir(&self) -> &Path {
        &self.ledger_dir
    }

    /// Load every readable record; unreadable files are skipped.
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.ledger_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(record) = serde_json::from_str::<RunRecord>(&content) {
                        self.runs.insert(record.id.clone(), record);
                    }
                }
            }
        }
    }

    /// All runs, oldest first
    pub fn list(&self) -> Vec<&RunRecord> {
        let mut runs: Vec<&RunRecord> = self.runs.values().collect();
        runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        runs
    }

    pub fn get(&self, id: &str) -> Option<&RunRecord> {
        self.runs.get(id)
    }

    /// Delete a run from the ledger
    pub fn delete(&mut self, id: &str) -> LedgerResult<()> {
        if self.runs.remove(id).is_none() {
            return Err(LedgerError::NotFound(id.to_string()));
        }
        fs::remove_file(self.record_path(id))?;
        Ok(())
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.ledger_dir.join(format!("{}.json", id))
    }
}

impl RunSink for RunLedger {
    fn persist(&mut self, record: &RunRecord) -> LedgerResult<String> {
        fs::create_dir_all(&self.ledger_dir)?;

        let content = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(&record.id), content)?;

        self.runs.insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new()
    }
}
