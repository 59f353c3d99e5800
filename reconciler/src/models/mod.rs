//! Domain models for roster reconciliation.
//!
//! - [`Roster`] - One parsed and validated roster snapshot
//! - [`Row`] - Field values of one data row, aligned to the roster header
//! - [`CompositeKey`] - Normalized key-column values used to match rows
//! - [`Change`] - Before/after pair of a changed field
//! - [`Update`] - A shared key with at least one changed field

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator used when a composite key is displayed as one string.
pub const KEY_DISPLAY_SEPARATOR: &str = "||";

// =============================================================================
// Composite Key
// =============================================================================

/// Normalized key-column values, compared as one ordered unit.
///
/// Keys order by their displayed form (`a||b`), so sorted key lists read
/// alphabetically. Keys whose displayed forms collide fall back to comparing
/// the parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Bytes of the displayed form, without allocating it.
    fn display_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().enumerate().flat_map(|(i, part)| {
            let separator: &[u8] = if i == 0 {
                b""
            } else {
                KEY_DISPLAY_SEPARATOR.as_bytes()
            };
            separator.iter().chain(part.as_bytes()).copied()
        })
    }
}

impl Ord for CompositeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_bytes()
            .cmp(other.display_bytes())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for CompositeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(KEY_DISPLAY_SEPARATOR))
    }
}

// =============================================================================
// Row
// =============================================================================

/// Raw field values of one row, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    /// Build a row padded or truncated to `width` fields.
    pub fn with_width(mut values: Vec<String>, width: usize) -> Self {
        values.resize(width, String::new());
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

// =============================================================================
// Roster
// =============================================================================

/// A count attached to a field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCount {
    pub field: String,
    pub count: usize,
}

/// Increment the counter for `field`, appending it on first sight.
pub(crate) fn bump(counts: &mut Vec<FieldCount>, field: &str) {
    match counts.iter_mut().find(|c| c.field == field) {
        Some(entry) => entry.count += 1,
        None => counts.push(FieldCount {
            field: field.to_string(),
            count: 1,
        }),
    }
}

/// One validated roster snapshot.
///
/// Every stored row had non-blank values in all key columns and a composite
/// key not seen earlier in the file. Built by
/// [`crate::parser::roster::load`]; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Roster {
    pub(crate) source: PathBuf,
    pub(crate) header: Vec<String>,
    pub(crate) key_columns: Vec<String>,
    pub(crate) rows: Vec<(CompositeKey, Row)>,
    pub(crate) index: HashMap<CompositeKey, usize>,
    pub(crate) duplicate_keys: Vec<CompositeKey>,
    pub(crate) invalid_lines: Vec<usize>,
    pub(crate) missing_key_counts: Vec<FieldCount>,
    pub(crate) total_rows: usize,
    pub(crate) non_empty_counts: Vec<usize>,
}

impl Roster {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Position of `field` in the header.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.header.iter().position(|h| h == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_index(field).is_some()
    }

    /// Valid rows in first-seen order.
    pub fn rows(&self) -> impl Iterator<Item = (&CompositeKey, &Row)> {
        self.rows.iter().map(|(k, r)| (k, r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CompositeKey> {
        self.rows.iter().map(|(k, _)| k)
    }

    pub fn get(&self, key: &CompositeKey) -> Option<&Row> {
        self.index.get(key).map(|&i| &self.rows[i].1)
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.index.contains_key(key)
    }

    /// Raw value of `field` in the row stored under `key`, or "" if either is absent.
    pub fn value(&self, key: &CompositeKey, field: &str) -> &str {
        match (self.get(key), self.field_index(field)) {
            (Some(row), Some(i)) => row.get(i).unwrap_or(""),
            _ => "",
        }
    }

    /// Number of valid rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_keys.len()
    }

    /// Colliding keys in the order they were encountered.
    pub fn duplicate_keys(&self) -> &[CompositeKey] {
        &self.duplicate_keys
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_lines.len()
    }

    /// 1-based source line numbers of rows with a blank key value.
    pub fn invalid_lines(&self) -> &[usize] {
        &self.invalid_lines
    }

    pub fn missing_key_counts(&self) -> &[FieldCount] {
        &self.missing_key_counts
    }

    /// Non-blank data lines, including invalid and duplicate rows.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn non_empty_count(&self, field: &str) -> usize {
        self.field_index(field)
            .and_then(|i| self.non_empty_counts.get(i).copied())
            .unwrap_or(0)
    }
}

// =============================================================================
// Changes
// =============================================================================

/// Raw before/after values of a field whose normalized forms differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub before: String,
    pub after: String,
}

/// A shared key whose row changed in at least one comparable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub key: CompositeKey,
    /// Changed fields in comparable-field order.
    pub changes: Vec<(String, Change)>,
}

impl Update {
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|(f, _)| f.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key_display() {
        let key = CompositeKey::new(vec!["a@x.com".into(), "Fall".into()]);
        assert_eq!(key.to_string(), "a@x.com||Fall");
    }

    #[test]
    fn test_composite_key_parts_are_one_unit() {
        // Joined forms collide, tuples do not.
        let a = CompositeKey::new(vec!["a||b".into(), "c".into()]);
        let b = CompositeKey::new(vec!["a".into(), "b||c".into()]);
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.parts(), &["a||b", "c"]);
    }

    #[test]
    fn test_composite_key_orders_by_displayed_form() {
        let smith = CompositeKey::new(vec!["Smith".into(), "Zed".into()]);
        let smithson = CompositeKey::new(vec!["Smithson".into(), "Amy".into()]);

        // "Smithson||Amy" < "Smith||Zed" because 's' < '|'.
        let mut keys = vec![smith.clone(), smithson.clone()];
        keys.sort();
        assert_eq!(keys, vec![smithson, smith]);

        let single: Vec<CompositeKey> = ["b", "a", "ab"]
            .iter()
            .map(|s| CompositeKey::new(vec![s.to_string()]))
            .collect();
        let mut sorted = single.clone();
        sorted.sort();
        let shown: Vec<String> = sorted.iter().map(|k| k.to_string()).collect();
        assert_eq!(shown, vec!["a", "ab", "b"]);
    }

    #[test]
    fn test_row_width() {
        let short = Row::with_width(vec!["1".into()], 3);
        assert_eq!(short.values(), &["1", "", ""]);

        let long = Row::with_width(vec!["1".into(), "2".into(), "3".into()], 2);
        assert_eq!(long.values(), &["1", "2"]);
    }

    #[test]
    fn test_bump_keeps_first_seen_order() {
        let mut counts = Vec::new();
        bump(&mut counts, "cohort");
        bump(&mut counts, "email");
        bump(&mut counts, "cohort");
        assert_eq!(counts[0], FieldCount { field: "cohort".into(), count: 2 });
        assert_eq!(counts[1], FieldCount { field: "email".into(), count: 1 });
    }
}
