//! Error types for the roster reconciliation pipeline.
//!
//! - [`LoadError`] - Reading and validating one roster file
//! - [`ConfigError`] - Rejected configuration values
//! - [`ExportError`] - Writing CSV exports
//! - [`LedgerError`] - Run ledger storage
//! - [`ReconcileError`] - Top-level orchestration errors
//!
//! Conversion into [`ReconcileError`] is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Row-level problems (blank key
//! values, duplicate keys) are never errors: the loader tallies them.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Roster Loading Errors
// =============================================================================

/// Errors while loading a roster file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is unusable (empty, or not UTF-8).
    #[error("Invalid CSV {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    /// Header does not fit the requested key columns.
    #[error("Schema error in {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },
}

impl LoadError {
    /// Path of the file that failed to load.
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Format { path, .. }
            | LoadError::Schema { path, .. } => path,
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration values rejected before any file is read.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid key normalize value: {0} (use none|lower|upper)")]
    InvalidKeyNormalize(String),

    #[error("Invalid value normalize value: {0} (use none|trim|collapse)")]
    InvalidValueNormalize(String),

    #[error("Invalid detail limit: {0} (must be an integer >= 0)")]
    InvalidDetailLimit(String),

    #[error("Invalid app name: {0} (use letters, numbers, underscores, dashes)")]
    InvalidAppName(String),

    #[error("At least one key column is required")]
    EmptyKeyColumns,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing CSV exports.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// =============================================================================
// Ledger Errors
// =============================================================================

/// Errors from the run ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Run not found.
    #[error("Run not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Ledger IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Ledger JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Reconcile Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Returned by [`crate::pipeline::reconcile_files`] and by the CLI commands.
/// Every variant is terminal: the run stops at the first one.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background load task panicked or was cancelled.
    #[error("Load task failed: {0}")]
    Task(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type LoadResult<T> = Result<T, LoadError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

pub type ExportResult<T> = Result<T, ExportError>;

pub type LedgerResult<T> = Result<T, LedgerError>;

pub type ReconcileResult<T> = Result<T, ReconcileError>;
