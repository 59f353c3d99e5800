//! # Roster Reconciler - composite-key diff of roster snapshots
//!
//! Compares two CSV exports of the same roster, matched by one or more key
//! columns, and reports added, removed, updated and unchanged entities with
//! field-level changes, aggregate ratios and per-file diagnostics.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │ previous.csv│────▶│   Loader    │──┐
//! └─────────────┘     └─────────────┘  │   ┌─────────────┐     ┌─────────────┐
//!                                      ├──▶│    Diff     │────▶│   Report    │──▶ text / JSON / CSV / ledger
//! ┌─────────────┐     ┌─────────────┐  │   └─────────────┘     └─────────────┘
//! │ current.csv │────▶│   Loader    │──┘
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roster_reconciler::{reconcile_files, ReconcileOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let report = reconcile_files(
//!         Path::new("previous.csv"),
//!         Path::new("current.csv"),
//!         &ReconcileOptions::default(),
//!     ).await.unwrap();
//!     println!("{}", report.to_text());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Roster, rows, composite keys and changes
//! - [`parser`] - Line parser and roster loader
//! - [`normalize`] - Key and value normalization policies
//! - [`diff`] - Reconciliation engine
//! - [`report`] - Aggregates plus text, JSON and CSV serializers
//! - [`validation`] - Configuration parsing
//! - [`pipeline`] - Load, reconcile, report in one call
//! - [`ledger`] - Persisted run records
//! - [`logs`] - Run log broadcasting

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod normalize;
pub mod parser;

// Reconciliation
pub mod diff;
pub mod pipeline;
pub mod report;

// Configuration
pub mod validation;

// Persistence
pub mod ledger;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    LedgerError,
    LoadError,
    ReconcileError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Change,
    CompositeKey,
    FieldCount,
    Roster,
    Row,
    Update,
};

// =============================================================================
// Re-exports - Parsing & normalization
// =============================================================================

pub use normalize::{KeyNormalize, ValueNormalize};
pub use parser::{load, load_str, parse_line};

// =============================================================================
// Re-exports - Diff & report
// =============================================================================

pub use diff::{reconcile, DiffResult};
pub use report::{
    ExportOptions,
    FieldCompleteness,
    Report,
    ReportConfig,
    ReportSnapshot,
    Summary,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{reconcile_files, reconcile_rosters, ReconcileOptions};

// =============================================================================
// Re-exports - Ledger
// =============================================================================

pub use ledger::{RunLedger, RunRecord, RunSink};
