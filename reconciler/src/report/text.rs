//! Plain-text rendering.

use std::fmt::{self, Display, Formatter};

use super::{FieldCompleteness, Report};
use crate::models::FieldCount;

impl Report {
    /// Render the human-readable report.
    pub fn to_text(&self) -> String {
        TextReport(self).to_string()
    }
}

/// Format a percentage with two decimals, or `n/a`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(pct) => format!("{:.2}%", pct),
        None => "n/a".to_string(),
    }
}

struct TextReport<'a>(&'a Report);

impl Display for TextReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let config = report.config();
        let s = report.summary();

        writeln!(f, "Roster Reconciler Report")?;
        writeln!(f, "Previous: {}", report.previous().source().display())?;
        writeln!(f, "Current: {}", report.current().source().display())?;
        writeln!(f, "Key Columns: {}", config.key_columns.join(", "))?;
        writeln!(f, "Key Normalize: {}", config.key_normalize)?;
        writeln!(f, "Value Normalize: {}", config.value_normalize)?;
        writeln!(f, "Summary Only: {}", config.summary_only)?;
        match config.detail_limit {
            0 => writeln!(f, "Detail Limit: none")?,
            limit => writeln!(f, "Detail Limit: {}", limit)?,
        }
        writeln!(f, "Timestamp: {}", report.generated_at().to_rfc3339())?;
        writeln!(f)?;

        writeln!(f, "Summary:")?;
        writeln!(f, "- total_previous: {}", s.total_previous)?;
        writeln!(f, "- total_current: {}", s.total_current)?;
        writeln!(f, "- added: {}", s.added)?;
        writeln!(f, "- removed: {}", s.removed)?;
        writeln!(f, "- updated: {}", s.updated)?;
        writeln!(f, "- unchanged: {}", s.unchanged)?;
        writeln!(f, "- duplicate_keys_previous: {}", s.duplicate_keys_previous)?;
        writeln!(f, "- duplicate_keys_current: {}", s.duplicate_keys_current)?;
        writeln!(f, "- invalid_rows_previous: {}", s.invalid_rows_previous)?;
        writeln!(f, "- invalid_rows_current: {}", s.invalid_rows_current)?;
        writeln!(f, "- net_change: {}", s.net_change)?;
        writeln!(f, "- net_change_pct_previous: {}", format_percent(s.net_change_pct_previous))?;
        writeln!(f, "- added_pct_current: {}", format_percent(s.added_pct_current))?;
        writeln!(f, "- removed_pct_previous: {}", format_percent(s.removed_pct_previous))?;
        writeln!(f, "- updated_pct_shared: {}", format_percent(s.updated_pct_shared))?;
        writeln!(f, "- unchanged_pct_shared: {}", format_percent(s.unchanged_pct_shared))?;
        writeln!(f)?;

        if config.summary_only {
            return Ok(());
        }

        self.write_details(f)
    }
}

impl TextReport<'_> {
    fn write_details(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let diff = report.diff();
        let previous = report.previous();
        let current = report.current();

        if !report.config().ignored_fields.is_empty() {
            writeln!(f, "Ignored Fields:")?;
            for field in &report.config().ignored_fields {
                writeln!(f, "  - {}", field)?;
            }
            writeln!(f)?;
        }

        if !diff.unknown_ignored_fields.is_empty() {
            writeln!(f, "Unknown Ignored Fields:")?;
            for field in &diff.unknown_ignored_fields {
                writeln!(f, "  - {}", field)?;
            }
            writeln!(f)?;
        }

        if !diff.added_columns.is_empty() || !diff.removed_columns.is_empty() {
            writeln!(f, "Column Changes:")?;
            if !diff.added_columns.is_empty() {
                writeln!(f, "  added: {}", diff.added_columns.join(", "))?;
            }
            if !diff.removed_columns.is_empty() {
                writeln!(f, "  removed: {}", diff.removed_columns.join(", "))?;
            }
            writeln!(f)?;
        }

        if !report.field_change_counts().is_empty() {
            writeln!(f, "Field Change Counts:")?;
            write_counts(f, report.field_change_counts(), "  ")?;
            writeln!(f)?;
        }

        if !previous.duplicate_keys().is_empty() || !current.duplicate_keys().is_empty() {
            writeln!(f, "Duplicate Key Values:")?;
            for (label, roster) in [("previous", previous), ("current", current)] {
                if !roster.duplicate_keys().is_empty() {
                    let keys: Vec<String> =
                        roster.duplicate_keys().iter().map(|k| k.to_string()).collect();
                    writeln!(f, "  {}: {}", label, keys.join(", "))?;
                }
            }
            writeln!(f)?;
        }

        if !previous.invalid_lines().is_empty() || !current.invalid_lines().is_empty() {
            writeln!(f, "Invalid Rows (1-based row numbers):")?;
            for (label, roster) in [("previous", previous), ("current", current)] {
                if !roster.invalid_lines().is_empty() {
                    let lines: Vec<String> =
                        roster.invalid_lines().iter().map(|n| n.to_string()).collect();
                    writeln!(f, "  {}: {}", label, lines.join(", "))?;
                }
            }
            writeln!(f)?;
        }

        let missing_previous = report.missing_key_counts_previous();
        let missing_current = report.missing_key_counts_current();
        if !missing_previous.is_empty() || !missing_current.is_empty() {
            writeln!(f, "Missing Key Field Counts:")?;
            for (label, counts) in [("previous", missing_previous), ("current", missing_current)] {
                if !counts.is_empty() {
                    writeln!(f, "  {}:", label)?;
                    write_counts(f, counts, "    ")?;
                }
            }
            writeln!(f)?;
        }

        if !previous.header().is_empty() || !current.header().is_empty() {
            writeln!(f, "Field Completeness (non-empty/total):")?;
            for (label, fields) in [
                ("previous", report.completeness_previous()),
                ("current", report.completeness_current()),
            ] {
                if !fields.is_empty() {
                    writeln!(f, "  {}:", label)?;
                    write_completeness(f, fields, "    ")?;
                }
            }
            writeln!(f)?;
        }

        let added: Vec<String> = diff.added.iter().map(|k| k.to_string()).collect();
        self.write_key_list(f, "Added", "+", &added)?;

        let removed: Vec<String> = diff.removed.iter().map(|k| k.to_string()).collect();
        self.write_key_list(f, "Removed", "-", &removed)?;

        if !diff.updates.is_empty() {
            let total = diff.updates.len();
            let shown = report.shown(total);
            writeln!(f, "Updated ({}):", total)?;
            for update in diff.updates.iter().take(shown) {
                writeln!(f, "  * {}", update.key)?;
                for (field, change) in &update.changes {
                    writeln!(f, "      {}: \"{}\" -> \"{}\"", field, change.before, change.after)?;
                }
            }
            write_showing(f, shown, total)?;
            writeln!(f)?;
        }

        Ok(())
    }

    fn write_key_list(
        &self,
        f: &mut Formatter<'_>,
        title: &str,
        marker: &str,
        keys: &[String],
    ) -> fmt::Result {
        if keys.is_empty() {
            return Ok(());
        }
        let shown = self.0.shown(keys.len());
        writeln!(f, "{} ({}):", title, keys.len())?;
        for key in keys.iter().take(shown) {
            writeln!(f, "  {} {}", marker, key)?;
        }
        write_showing(f, shown, keys.len())?;
        writeln!(f)
    }
}

fn write_showing(f: &mut Formatter<'_>, shown: usize, total: usize) -> fmt::Result {
    if shown < total {
        writeln!(f, "  ... (showing {} of {})", shown, total)?;
    }
    Ok(())
}

fn write_counts(f: &mut Formatter<'_>, counts: &[FieldCount], indent: &str) -> fmt::Result {
    for entry in counts {
        writeln!(f, "{}- {}: {}", indent, entry.field, entry.count)?;
    }
    Ok(())
}

fn write_completeness(
    f: &mut Formatter<'_>,
    fields: &[FieldCompleteness],
    indent: &str,
) -> fmt::Result {
    for entry in fields {
        writeln!(
            f,
            "{}- {}: {}/{} ({})",
            indent,
            entry.field,
            entry.non_empty,
            entry.total,
            format_percent(entry.pct)
        )?;
    }
    Ok(())
}
