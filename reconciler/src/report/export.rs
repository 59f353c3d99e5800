//! Per-category CSV exports.
//!
//! | File | Rows |
//! |---|---|
//! | `added.csv` | full current-header rows of added keys |
//! | `removed.csv` | full previous-header rows of removed keys |
//! | `updated.csv` | one line per updated key and changed field |
//! | `unchanged.csv` | full current-header rows of unchanged keys (optional) |
//! | `updated_rows.csv` | one line per updated key, every field as `_before`/`_after` (optional) |
//! | `status.csv` | one line per key with its status (optional) |
//!
//! Exports are never truncated by the detail limit. Files are written one
//! after another; a failure leaves earlier files in place.

use csv::{QuoteStyle, Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::Report;
use crate::error::{ExportError, ExportResult};
use crate::models::{CompositeKey, Roster};

/// Which optional files to write next to the three mandatory ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub unchanged: bool,
    pub updated_rows: bool,
    pub status: bool,
}

impl Report {
    /// Write CSV exports into `dir`, creating it if needed.
    ///
    /// Returns the paths written, in write order.
    pub fn write_exports(&self, dir: &Path, options: ExportOptions) -> ExportResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let diff = self.diff();
        let mut written = Vec::new();

        written.push(export_file(dir, "added.csv", |w| {
            write_roster_rows(w, self.current(), &diff.added)
        })?);
        written.push(export_file(dir, "removed.csv", |w| {
            write_roster_rows(w, self.previous(), &diff.removed)
        })?);
        written.push(export_file(dir, "updated.csv", |w| self.write_updated(w))?);

        if options.unchanged {
            written.push(export_file(dir, "unchanged.csv", |w| {
                write_roster_rows(w, self.current(), &diff.unchanged)
            })?);
        }
        if options.updated_rows {
            written.push(export_file(dir, "updated_rows.csv", |w| self.write_updated_rows(w))?);
        }
        if options.status {
            written.push(export_file(dir, "status.csv", |w| self.write_status(w))?);
        }

        Ok(written)
    }

    fn write_updated(&self, w: &mut Writer<File>) -> csv::Result<()> {
        w.write_record(["key", "field", "before", "after"])?;
        for update in &self.diff().updates {
            let key = update.key.to_string();
            for (field, change) in &update.changes {
                w.write_record([
                    key.as_str(),
                    field.as_str(),
                    change.before.as_str(),
                    change.after.as_str(),
                ])?;
            }
        }
        Ok(())
    }

    fn write_updated_rows(&self, w: &mut Writer<File>) -> csv::Result<()> {
        let fields = &self.diff().combined_header;

        let mut header = vec!["key".to_string()];
        for field in fields {
            header.push(format!("{}_before", field));
            header.push(format!("{}_after", field));
        }
        w.write_record(&header)?;

        for update in &self.diff().updates {
            let mut record = vec![update.key.to_string()];
            for field in fields {
                record.push(self.previous().value(&update.key, field).to_string());
                record.push(self.current().value(&update.key, field).to_string());
            }
            w.write_record(&record)?;
        }
        Ok(())
    }

    fn write_status(&self, w: &mut Writer<File>) -> csv::Result<()> {
        let diff = self.diff();
        let mut entries: Vec<(&CompositeKey, &str, String)> = Vec::new();
        entries.extend(diff.added.iter().map(|k| (k, "added", String::new())));
        entries.extend(diff.removed.iter().map(|k| (k, "removed", String::new())));
        entries.extend(
            diff.updates
                .iter()
                .map(|u| (&u.key, "updated", u.changed_fields().collect::<Vec<_>>().join(";"))),
        );
        entries.extend(diff.unchanged.iter().map(|k| (k, "unchanged", String::new())));
        entries.sort_by(|a, b| a.0.cmp(b.0));

        w.write_record(["key", "status", "changed_fields"])?;
        for (key, status, changed) in entries {
            let key = key.to_string();
            w.write_record([key.as_str(), status, changed.as_str()])?;
        }
        Ok(())
    }
}

fn export_file(
    dir: &Path,
    name: &str,
    write: impl FnOnce(&mut Writer<File>) -> csv::Result<()>,
) -> ExportResult<PathBuf> {
    let path = dir.join(name);
    let csv_err = |source| ExportError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_path(&path)
        .map_err(csv_err)?;
    write(&mut writer).map_err(csv_err)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Header plus the full row of each key, in the given (sorted) order.
fn write_roster_rows(
    w: &mut Writer<File>,
    roster: &Roster,
    keys: &[CompositeKey],
) -> csv::Result<()> {
    w.write_record(roster.header())?;
    for key in keys {
        if let Some(row) = roster.get(key) {
            w.write_record(row.values())?;
        }
    }
    Ok(())
}
