//! Roster Reconciler CLI - compare two roster snapshots
//!
//! # Commands
//!
//! ```bash
//! roster-reconciler run --previous old.csv --current new.csv   # Print the text report
//! roster-reconciler run ... --json report.json --export-dir out # Also write JSON and CSV exports
//! roster-reconciler run ... --log-run                          # Store a run record
//! roster-reconciler history list                               # Manage stored run records
//! ```
//!
//! Every `run` option can also be set through a `ROSTER_*` environment
//! variable (a `.env` file is loaded first).

use chrono::Utc;
use clap::{Parser, Subcommand};
use roster_reconciler::error::{ReconcileError, ReconcileResult};
use roster_reconciler::ledger::{DEFAULT_APP_NAME, DEFAULT_LEDGER_DIR};
use roster_reconciler::logs::{log_info, log_success, LOG_BROADCASTER};
use roster_reconciler::validation::{
    parse_detail_limit, parse_ignored_fields, parse_key_columns, validate_app_name,
};
use roster_reconciler::{
    reconcile_files, ExportOptions, KeyNormalize, LedgerError, ReconcileOptions, RunLedger,
    RunRecord, RunSink, ValueNormalize,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "roster-reconciler")]
#[command(about = "Reconcile two roster CSV snapshots by composite key", long_about = None)]
struct Cli {
    /// Silence progress logs on stderr
    #[arg(short, long, global = true, env = "ROSTER_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile two snapshots and print the report
    Run(RunArgs),

    /// Manage stored run records
    History {
        #[command(subcommand)]
        action: HistoryAction,

        /// Ledger directory
        #[arg(long, global = true, env = "ROSTER_LEDGER_DIR", default_value = DEFAULT_LEDGER_DIR)]
        ledger_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Previous snapshot
    #[arg(long, env = "ROSTER_PREVIOUS")]
    previous: PathBuf,

    /// Current snapshot
    #[arg(long, env = "ROSTER_CURRENT")]
    current: PathBuf,

    /// Comma-separated key columns (default: email)
    #[arg(short, long, env = "ROSTER_KEY")]
    key: Option<String>,

    /// Key normalization: none|lower|upper
    #[arg(long, env = "ROSTER_KEY_NORMALIZE", default_value = "none")]
    key_normalize: String,

    /// Value normalization: none|trim|collapse
    #[arg(long, env = "ROSTER_VALUE_NORMALIZE", default_value = "none")]
    value_normalize: String,

    /// Comma-separated fields excluded from change detection
    #[arg(long, env = "ROSTER_IGNORE")]
    ignore: Option<String>,

    /// Maximum itemized entries per category (0 = unlimited)
    #[arg(long, env = "ROSTER_MAX_DETAIL", allow_negative_numbers = true)]
    max_detail: Option<String>,

    /// Only render aggregates
    #[arg(long, env = "ROSTER_SUMMARY_ONLY")]
    summary_only: bool,

    /// Write the JSON report to this file
    #[arg(long, env = "ROSTER_JSON")]
    json: Option<PathBuf>,

    /// Write per-category CSV files into this directory
    #[arg(long, env = "ROSTER_EXPORT_DIR")]
    export_dir: Option<PathBuf>,

    /// Also export unchanged rows
    #[arg(long, env = "ROSTER_EXPORT_UNCHANGED")]
    export_unchanged: bool,

    /// Also export full before/after rows of updated keys
    #[arg(long, env = "ROSTER_EXPORT_UPDATED_ROWS")]
    export_updated_rows: bool,

    /// Also export one status line per key
    #[arg(long, env = "ROSTER_EXPORT_STATUS")]
    export_status: bool,

    /// Store a run record in the ledger
    #[arg(long, env = "ROSTER_LOG_RUN")]
    log_run: bool,

    /// Ledger directory
    #[arg(long, env = "ROSTER_LEDGER_DIR", default_value = DEFAULT_LEDGER_DIR)]
    ledger_dir: PathBuf,

    /// App name recorded with the run
    #[arg(long, env = "ROSTER_APP", default_value = DEFAULT_APP_NAME)]
    app: String,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List stored runs, oldest first
    List,

    /// Show a stored run
    Show {
        /// Run ID
        id: String,
    },

    /// Delete a stored run
    Delete {
        /// Run ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::History { action, ledger_dir } => cmd_history(action, &ledger_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

impl RunArgs {
    fn options(&self) -> ReconcileResult<ReconcileOptions> {
        Ok(ReconcileOptions {
            key_columns: parse_key_columns(self.key.as_deref()),
            key_normalize: self.key_normalize.parse::<KeyNormalize>()?,
            value_normalize: self.value_normalize.parse::<ValueNormalize>()?,
            ignored_fields: parse_ignored_fields(self.ignore.as_deref()),
            detail_limit: parse_detail_limit(self.max_detail.as_deref().unwrap_or(""))?,
            summary_only: self.summary_only,
        })
    }

    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            unchanged: self.export_unchanged,
            updated_rows: self.export_updated_rows,
            status: self.export_status,
        }
    }
}

async fn cmd_run(args: RunArgs) -> ReconcileResult<()> {
    let started_at = Utc::now();
    let options = args.options()?;
    if args.log_run {
        validate_app_name(&args.app)?;
    }

    let report = reconcile_files(&args.previous, &args.current, &options).await?;

    print!("{}", report.to_text());

    if let Some(path) = &args.json {
        write_output(path, &report.to_json())?;
        log_success(format!("JSON report written to: {}", path.display()));
    }

    if let Some(dir) = &args.export_dir {
        let written = report.write_exports(dir, args.export_options())?;
        log_success(format!("{} export file(s) written to: {}", written.len(), dir.display()));
    }

    if args.log_run {
        let record = RunRecord::new(&args.app, &options, &report, started_at)?;
        let mut ledger = RunLedger::with_dir(&args.ledger_dir);
        let id = ledger.persist(&record)?;
        log_success(format!("Run logged: {}", id));
    }

    Ok(())
}

fn write_output(path: &Path, content: &str) -> ReconcileResult<()> {
    fs::write(path, content).map_err(|source| ReconcileError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn cmd_history(action: HistoryAction, ledger_dir: &Path) -> ReconcileResult<()> {
    let mut ledger = RunLedger::with_dir(ledger_dir);

    match action {
        HistoryAction::List => {
            let runs = ledger.list();
            if runs.is_empty() {
                log_info(format!("No runs stored in {}", ledger.dir().display()));
                return Ok(());
            }

            for run in runs {
                let s = &run.snapshot.summary;
                println!("{} ({})", run.id, run.app);
                println!("   Started: {} ({} ms)", run.started_at.to_rfc3339(), run.duration_ms);
                println!("   Files: {} -> {}", run.previous.display(), run.current.display());
                println!(
                    "   Added: {}, Removed: {}, Updated: {}, Unchanged: {}",
                    s.added, s.removed, s.updated, s.unchanged
                );
                println!();
            }
        }

        HistoryAction::Show { id } => {
            let run = ledger
                .get(&id)
                .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
            let json = serde_json::to_string_pretty(run).map_err(LedgerError::from)?;
            println!("{}", json);
        }

        HistoryAction::Delete { id } => {
            ledger.delete(&id)?;
            log_success(format!("Run deleted: {}", id));
        }
    }

    Ok(())
}
