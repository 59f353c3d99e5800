//! Diff engine: composite-key set difference and field-level change detection.
//!
//! # Architecture
//!
//! ```text
//! previous keys ─┬─ only previous ──▶ removed
//!                ├─ both ───────────▶ compare comparable fields ─┬─▶ updated
//! current keys  ─┘                                               └─▶ unchanged
//!                └─ only current ───▶ added
//! ```
//!
//! Comparable fields are the previous-header fields that also exist in the
//! current header and are not ignored. Values are compared after
//! [`ValueNormalize`]; recorded changes keep the raw values.

use std::collections::BTreeSet;

use crate::models::{bump, Change, CompositeKey, FieldCount, Roster, Update};
use crate::normalize::ValueNormalize;

/// Result of reconciling two rosters. All key lists are sorted ascending.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub added: Vec<CompositeKey>,
    pub removed: Vec<CompositeKey>,
    /// Updates sorted by key.
    pub updates: Vec<Update>,
    pub unchanged: Vec<CompositeKey>,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    /// Ignored fields present in neither header.
    pub unknown_ignored_fields: Vec<String>,
    pub comparable_fields: Vec<String>,
    /// Previous header followed by fields only the current header has.
    pub combined_header: Vec<String>,
    /// Changed-row count per field, in first-seen order.
    pub field_change_counts: Vec<FieldCount>,
}

impl DiffResult {
    /// Keys present in both rosters.
    pub fn shared_count(&self) -> usize {
        self.updates.len() + self.unchanged.len()
    }
}

/// Reconcile `previous` against `current`.
///
/// Pure: neither roster is modified and nothing is logged.
pub fn reconcile(
    previous: &Roster,
    current: &Roster,
    ignored_fields: &BTreeSet<String>,
    value_normalize: ValueNormalize,
) -> DiffResult {
    let mut added: Vec<CompositeKey> = current
        .keys()
        .filter(|k| !previous.contains(k))
        .cloned()
        .collect();
    added.sort();

    let mut removed: Vec<CompositeKey> = previous
        .keys()
        .filter(|k| !current.contains(k))
        .cloned()
        .collect();
    removed.sort();

    let added_columns = column_difference(current.header(), previous);
    let removed_columns = column_difference(previous.header(), current);

    let unknown_ignored_fields: Vec<String> = ignored_fields
        .iter()
        .filter(|f| !previous.has_field(f) && !current.has_field(f))
        .cloned()
        .collect();

    let mut combined_header = previous.header().to_vec();
    for field in current.header() {
        if !combined_header.contains(field) {
            combined_header.push(field.clone());
        }
    }

    // (field, previous position, current position)
    let comparable: Vec<(&str, usize, usize)> = previous
        .header()
        .iter()
        .enumerate()
        .filter(|(_, f)| !ignored_fields.contains(*f))
        .filter_map(|(i, f)| current.field_index(f).map(|j| (f.as_str(), i, j)))
        .collect();

    let mut updates = Vec::new();
    let mut unchanged = Vec::new();
    let mut field_change_counts = Vec::new();

    for (key, prev_row) in previous.rows() {
        let Some(cur_row) = current.get(key) else {
            continue;
        };

        let mut changes = Vec::new();
        for &(field, i, j) in &comparable {
            let before = prev_row.get(i).unwrap_or("");
            let after = cur_row.get(j).unwrap_or("");
            if !value_normalize.same(before, after) {
                changes.push((
                    field.to_string(),
                    Change {
                        before: before.to_string(),
                        after: after.to_string(),
                    },
                ));
                bump(&mut field_change_counts, field);
            }
        }

        if changes.is_empty() {
            unchanged.push(key.clone());
        } else {
            updates.push(Update {
                key: key.clone(),
                changes,
            });
        }
    }

    updates.sort_by(|a, b| a.key.cmp(&b.key));
    unchanged.sort();

    DiffResult {
        added,
        removed,
        updates,
        unchanged,
        added_columns,
        removed_columns,
        unknown_ignored_fields,
        comparable_fields: comparable.iter().map(|(f, _, _)| f.to_string()).collect(),
        combined_header,
        field_change_counts,
    }
}

/// Fields of `header` that `other` lacks, sorted.
fn column_difference(header: &[String], other: &Roster) -> Vec<String> {
    header
        .iter()
        .filter(|f| !other.has_field(f))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::KeyNormalize;
    use crate::parser::load_str;

    fn roster(csv: &str, key: &[&str], normalize: KeyNormalize) -> Roster {
        let columns: Vec<String> = key.iter().map(|s| s.to_string()).collect();
        load_str("test.csv", csv, &columns, normalize).unwrap()
    }

    fn by_email(csv: &str) -> Roster {
        roster(csv, &["email"], KeyNormalize::None)
    }

    fn key(value: &str) -> CompositeKey {
        CompositeKey::new(vec![value.to_string()])
    }

    #[test]
    fn test_added_removed_updated() {
        let previous = by_email("email,cohort\na@x.com,Fall\nb@x.com,Fall\n");
        let current = by_email("email,cohort\na@x.com,Spring\nc@x.com,Fall\n");

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);

        assert_eq!(diff.added, vec![key("c@x.com")]);
        assert_eq!(diff.removed, vec![key("b@x.com")]);
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].key, key("a@x.com"));
        assert_eq!(
            diff.updates[0].changes,
            vec![(
                "cohort".to_string(),
                Change { before: "Fall".into(), after: "Spring".into() }
            )]
        );
        assert!(diff.unchanged.is_empty());
        assert_eq!(
            diff.field_change_counts,
            vec![FieldCount { field: "cohort".into(), count: 1 }]
        );
    }

    #[test]
    fn test_key_normalization_matches_across_files() {
        let previous = roster("email,cohort\nA@X.com,Fall\n", &["email"], KeyNormalize::Lower);
        let current = roster("email,cohort\na@x.com,Fall\n", &["email"], KeyNormalize::Lower);

        let ignored: BTreeSet<String> = ["email".to_string()].into();
        let diff = reconcile(&previous, &current, &ignored, ValueNormalize::None);

        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.unchanged, vec![key("a@x.com")]);
    }

    #[test]
    fn test_collapse_suppresses_whitespace_change() {
        let previous = by_email("email,name\na@x.com,John  Doe\n");
        let current = by_email("email,name\na@x.com,John Doe\n");

        let collapsed = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::Collapse);
        assert!(collapsed.updates.is_empty());
        assert_eq!(collapsed.unchanged.len(), 1);

        let strict = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);
        assert_eq!(strict.updates.len(), 1);
        assert_eq!(strict.updates[0].changes[0].1.before, "John  Doe");
    }

    #[test]
    fn test_identical_rosters_are_unchanged() {
        let csv = "email,name,cohort\nb@x.com,B,Fall\na@x.com,A,Spring\n,Ghost,Fall\n";
        let previous = roster(csv, &["email"], KeyNormalize::None);
        let current = roster(csv, &["email"], KeyNormalize::None);

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.updates.is_empty());
        assert_eq!(diff.unchanged.len(), previous.len());
        assert_eq!(diff.unchanged, vec![key("a@x.com"), key("b@x.com")]);
    }

    #[test]
    fn test_set_properties() {
        let previous = roster("id,v\n1,a\n2,b\n3,c\n4,d\n", &["id"], KeyNormalize::None);
        let current = roster("id,v\n3,c\n4,x\n5,e\n6,f\n", &["id"], KeyNormalize::None);

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);

        assert!(diff.added.iter().all(|k| !diff.removed.contains(k)));
        assert_eq!(diff.added.len() + diff.shared_count(), current.len());
        assert_eq!(diff.removed.len() + diff.shared_count(), previous.len());
        assert_eq!(diff.shared_count(), 2);
    }

    #[test]
    fn test_columns_and_ignored_fields() {
        let previous = by_email("email,name,phone,notes\na@x.com,A,1,x\n");
        let current = by_email("email,name,zip,notes,city\na@x.com,A,9,y,Paris\n");

        let ignored: BTreeSet<String> = ["notes".to_string(), "nickname".to_string()].into();
        let diff = reconcile(&previous, &current, &ignored, ValueNormalize::None);

        assert_eq!(diff.added_columns, vec!["city", "zip"]);
        assert_eq!(diff.removed_columns, vec!["phone"]);
        assert_eq!(diff.unknown_ignored_fields, vec!["nickname"]);
        assert_eq!(diff.comparable_fields, vec!["email", "name"]);
        assert_eq!(
            diff.combined_header,
            vec!["email", "name", "phone", "notes", "zip", "city"]
        );
        // notes changed but is ignored
        assert!(diff.updates.is_empty());
    }

    #[test]
    fn test_updates_sorted_and_counts_first_seen() {
        let previous = roster(
            "id,name,cohort\nb,B,Fall\na,A,Fall\nc,C,Fall\n",
            &["id"],
            KeyNormalize::None,
        );
        let current = roster(
            "id,name,cohort\nb,B2,Spring\na,A,Spring\nc,C2,Fall\n",
            &["id"],
            KeyNormalize::None,
        );

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);

        let order: Vec<String> = diff.updates.iter().map(|u| u.key.to_string()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(
            diff.field_change_counts,
            vec![
                FieldCount { field: "name".into(), count: 2 },
                FieldCount { field: "cohort".into(), count: 2 },
            ]
        );
        let fields: Vec<&str> = diff.updates[1].changed_fields().collect();
        assert_eq!(fields, vec!["name", "cohort"]);
    }

    #[test]
    fn test_composite_key_match() {
        let key = ["first", "last"];
        let previous = roster(
            "first,last,team\nAda,Lovelace,Red\nAda,Byron,Blue\n",
            &key,
            KeyNormalize::None,
        );
        let current = roster("first,last,team\nAda,Lovelace,Green\n", &key, KeyNormalize::None);

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);
        assert_eq!(diff.removed[0].to_string(), "Ada||Byron");
        assert_eq!(diff.updates[0].key.to_string(), "Ada||Lovelace");
    }

    #[test]
    fn test_multi_column_keys_sort_by_displayed_form() {
        let key = ["last", "first"];
        let previous = roster(
            "last,first,team\nSmith,Zed,Red\nSmithson,Amy,Red\n",
            &key,
            KeyNormalize::None,
        );
        let current = roster(
            "last,first,team\nSmith,Zed,Blue\nSmithson,Amy,Blue\n",
            &key,
            KeyNormalize::None,
        );
        let empty = roster("last,first,team\n", &key, KeyNormalize::None);

        let added = reconcile(&empty, &current, &BTreeSet::new(), ValueNormalize::None);
        let shown: Vec<String> = added.added.iter().map(|k| k.to_string()).collect();
        assert_eq!(shown, vec!["Smithson||Amy", "Smith||Zed"]);

        let diff = reconcile(&previous, &current, &BTreeSet::new(), ValueNormalize::None);
        let updated: Vec<String> = diff.updates.iter().map(|u| u.key.to_string()).collect();
        assert_eq!(updated, vec!["Smithson||Amy", "Smith||Zed"]);
    }
}
