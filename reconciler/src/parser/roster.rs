//! Roster loader: header validation, row padding, composite keys and
//! per-file diagnostics.
//!
//! Rows with a blank key value are counted invalid (with their line number)
//! and rows repeating an earlier composite key are counted duplicate. Both are
//! dropped; the first occurrence of a key wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::parse_line;
use crate::error::{LoadError, LoadResult};
use crate::models::{bump, CompositeKey, FieldCount, Roster, Row};
use crate::normalize::KeyNormalize;

/// Load a roster from a UTF-8 file.
///
/// # Errors
/// - [`LoadError::Io`] if the file cannot be read
/// - [`LoadError::Format`] if it is empty or not valid UTF-8
/// - [`LoadError::Schema`] if a key column is missing from the header, or if
///   the header names the same field twice (stricter than a last-column-wins
///   reading, which would silently drop one of the two values)
pub fn load(
    path: impl AsRef<Path>,
    key_columns: &[String],
    key_normalize: KeyNormalize,
) -> LoadResult<Roster> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (content, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(LoadError::Format {
            path: path.to_path_buf(),
            message: "file is not valid UTF-8".to_string(),
        });
    }

    load_str(path, &content, key_columns, key_normalize)
}

/// Build a roster from in-memory CSV text. `source` is used for error
/// context and report headers only.
pub fn load_str(
    source: impl AsRef<Path>,
    content: &str,
    key_columns: &[String],
    key_normalize: KeyNormalize,
) -> LoadResult<Roster> {
    let source = source.as_ref().to_path_buf();
    let mut lines = content.lines();

    let header_line = lines.next().ok_or_else(|| LoadError::Format {
        path: source.clone(),
        message: "CSV is empty".to_string(),
    })?;
    let header = parse_line(header_line);
    let key_positions = resolve_key_columns(&source, &header, key_columns)?;

    let mut builder = RosterBuilder::new(source, header, key_columns.to_vec());
    for (idx, line) in lines.enumerate() {
        // Header is line 1.
        let line_number = idx + 2;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        builder.push(line_number, parse_line(line), &key_positions, key_normalize);
    }

    Ok(builder.finish())
}

/// Map each key column to its header position, rejecting missing columns and
/// repeated header fields.
fn resolve_key_columns(
    source: &Path,
    header: &[String],
    key_columns: &[String],
) -> LoadResult<Vec<usize>> {
    for (i, field) in header.iter().enumerate() {
        if header[..i].contains(field) {
            return Err(LoadError::Schema {
                path: source.to_path_buf(),
                message: format!("duplicate header column '{}'", field),
            });
        }
    }

    let missing: Vec<&str> = key_columns
        .iter()
        .filter(|k| !header.contains(k))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::Schema {
            path: source.to_path_buf(),
            message: format!("Key column(s) {} not found", missing.join(", ")),
        });
    }

    Ok(key_columns
        .iter()
        .filter_map(|k| header.iter().position(|h| h == k))
        .collect())
}

/// Accumulators scoped to one load call.
struct RosterBuilder {
    source: PathBuf,
    header: Vec<String>,
    key_columns: Vec<String>,
    rows: Vec<(CompositeKey, Row)>,
    index: HashMap<CompositeKey, usize>,
    duplicate_keys: Vec<CompositeKey>,
    invalid_lines: Vec<usize>,
    missing_key_counts: Vec<FieldCount>,
    total_rows: usize,
    non_empty_counts: Vec<usize>,
}

impl RosterBuilder {
    fn new(source: PathBuf, header: Vec<String>, key_columns: Vec<String>) -> Self {
        let width = header.len();
        Self {
            source,
            header,
            key_columns,
            rows: Vec::new(),
            index: HashMap::new(),
            duplicate_keys: Vec::new(),
            invalid_lines: Vec::new(),
            missing_key_counts: Vec::new(),
            total_rows: 0,
            non_empty_counts: vec![0; width],
        }
    }

    fn push(
        &mut self,
        line_number: usize,
        values: Vec<String>,
        key_positions: &[usize],
        key_normalize: KeyNormalize,
    ) {
        self.total_rows += 1;
        let row = Row::with_width(values, self.header.len());

        for (count, value) in self.non_empty_counts.iter_mut().zip(row.values()) {
            if !value.trim().is_empty() {
                *count += 1;
            }
        }

        let mut parts = Vec::with_capacity(key_positions.len());
        let mut missing_key = false;
        for (column, &pos) in self.key_columns.iter().zip(key_positions) {
            let raw = row.get(pos).unwrap_or("").trim();
            if raw.is_empty() {
                missing_key = true;
                bump(&mut self.missing_key_counts, column);
            } else {
                parts.push(key_normalize.apply(raw).into_owned());
            }
        }

        if missing_key {
            self.invalid_lines.push(line_number);
            return;
        }

        let key = CompositeKey::new(parts);
        if self.index.contains_key(&key) {
            self.duplicate_keys.push(key);
            return;
        }

        self.index.insert(key.clone(), self.rows.len());
        self.rows.push((key, row));
    }

    fn finish(self) -> Roster {
        Roster {
            source: self.source,
            header: self.header,
            key_columns: self.key_columns,
            rows: self.rows,
            index: self.index,
            duplicate_keys: self.duplicate_keys,
            invalid_lines: self.invalid_lines,
            missing_key_counts: self.missing_key_counts,
            total_rows: self.total_rows,
            non_empty_counts: self.non_empty_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_key_values_counted_invalid() {
        let csv = "email,cohort,name\n\
                   ,Spring,NoEmail\n\
                   test@example.com,,MissingCohort\n\
                   ok@example.com,Fall,Ok\n";
        let columns = keys(&["email", "cohort"]);
        let roster = load_str("roster.csv", csv, &columns, KeyNormalize::None).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.invalid_count(), 2);
        assert_eq!(roster.invalid_lines(), &[2, 3]);
        assert_eq!(
            roster.missing_key_counts(),
            &[
                FieldCount { field: "email".into(), count: 1 },
                FieldCount { field: "cohort".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_duplicate_keeps_first_occurrence() {
        let csv = "email,name\na@x.com,First\n,Blank\na@x.com,Second\n";
        let roster = load_str("roster.csv", csv, &keys(&["email"]), KeyNormalize::None).unwrap();

        let key = CompositeKey::new(vec!["a@x.com".into()]);
        assert_eq!(roster.value(&key, "name"), "First");
        assert_eq!(roster.duplicate_count(), 1);
        assert_eq!(roster.duplicate_keys(), &[key]);
        // Blank key is invalid, not duplicate.
        assert_eq!(roster.invalid_lines(), &[3]);
    }

    #[test]
    fn test_total_rows_balance() {
        let csv = "email,name\na@x.com,A\n\n   \nb@x.com,B\na@x.com,A2\n,Nobody\n";
        let roster = load_str("roster.csv", csv, &keys(&["email"]), KeyNormalize::None).unwrap();

        assert_eq!(roster.total_rows(), 4);
        assert_eq!(
            roster.total_rows(),
            roster.len() + roster.invalid_count() + roster.duplicate_count()
        );
        // Blank lines still advance numbering.
        assert_eq!(roster.invalid_lines(), &[7]);
    }

    #[test]
    fn test_key_normalization_and_trim() {
        let csv = "email,name\n  A@X.com ,A\na@x.COM,Again\n";
        let roster = load_str("roster.csv", csv, &keys(&["email"]), KeyNormalize::Lower).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.duplicate_count(), 1);
        let key = CompositeKey::new(vec!["a@x.com".into()]);
        assert!(roster.contains(&key));
        // Raw value is stored unmodified apart from the line trim.
        assert_eq!(roster.value(&key, "email"), "A@X.com ");
    }

    #[test]
    fn test_rederived_key_matches_stored_key() {
        let csv = "first,last,dob\nAda,Lovelace,1815\nalan,Turing,1912\n";
        let columns = keys(&["first", "last"]);
        let roster = load_str("roster.csv", csv, &columns, KeyNormalize::Upper).unwrap();
        assert_eq!(roster.key_columns(), columns.as_slice());

        for (key, row) in roster.rows() {
            let parts: Vec<String> = roster
                .key_columns()
                .iter()
                .map(|c| {
                    let i = roster.field_index(c).unwrap();
                    KeyNormalize::Upper.apply(row.get(i).unwrap().trim()).into_owned()
                })
                .collect();
            assert_eq!(&CompositeKey::new(parts), key);
        }
    }

    #[test]
    fn test_width_tolerance_and_completeness() {
        let csv = "email,cohort,name\na@x.com\nb@x.com,Fall,B,extra,more\n";
        let roster = load_str("roster.csv", csv, &keys(&["email"]), KeyNormalize::None).unwrap();

        let a = CompositeKey::new(vec!["a@x.com".into()]);
        assert_eq!(roster.get(&a).unwrap().values().len(), 3);
        assert_eq!(roster.value(&a, "cohort"), "");
        assert_eq!(roster.non_empty_count("email"), 2);
        assert_eq!(roster.non_empty_count("cohort"), 1);
        assert_eq!(roster.non_empty_count("missing"), 0);
    }

    #[test]
    fn test_missing_key_column_is_schema_error() {
        let csv = "name,cohort\nA,Fall\n";
        let columns = keys(&["email", "id"]);
        let err = load_str("roster.csv", csv, &columns, KeyNormalize::None).unwrap_err();
        match err {
            LoadError::Schema { message, .. } => assert!(message.contains("email, id")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_header_is_schema_error() {
        let csv = "email,name,name\na@x.com,A,B\n";
        let err = load_str("roster.csv", csv, &keys(&["email"]), KeyNormalize::None).unwrap_err();
        assert!(matches!(err, LoadError::Schema { .. }));
    }

    #[test]
    fn test_empty_file_is_format_error() {
        let err = load_str("roster.csv", "", &keys(&["email"]), KeyNormalize::None).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn test_load_file_strips_bom() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFemail,name\r\na@x.com,A\r\n").unwrap();

        let roster = load(file.path(), &keys(&["email"]), KeyNormalize::None).unwrap();
        assert_eq!(roster.header(), &["email", "name"]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.source(), file.path());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = load(path, &keys(&["email"]), KeyNormalize::None).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"email,name\na@x.com,Soci\xE9t\xE9\n").unwrap();

        let err = load(file.path(), &keys(&["email"]), KeyNormalize::None).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }
}
