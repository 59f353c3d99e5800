//! JSON rendering.
//!
//! Keys are emitted in the same order as the text report (serde_json is
//! built with `preserve_order`). Percentages are numbers rounded to four
//! decimals, or `null` when the denominator is zero.

use serde_json::{json, Map, Value};

use super::{FieldCompleteness, Report};
use crate::models::{CompositeKey, FieldCount};

impl Report {
    /// Render the report as a pretty-printed JSON document.
    pub fn to_json(&self) -> String {
        format!("{:#}", self.to_json_value())
    }

    pub fn to_json_value(&self) -> Value {
        let config = self.config();
        let diff = self.diff();
        let s = self.summary();

        let mut doc = Map::new();
        doc.insert("previous".into(), json!(self.previous().source().display().to_string()));
        doc.insert("current".into(), json!(self.current().source().display().to_string()));
        doc.insert("key".into(), json!(config.key_columns.join(", ")));
        doc.insert("key_columns".into(), json!(config.key_columns));
        doc.insert("key_normalize".into(), json!(config.key_normalize));
        doc.insert("value_normalize".into(), json!(config.value_normalize));
        doc.insert("ignored_fields".into(), json!(config.ignored_fields));
        doc.insert("unknown_ignored_fields".into(), json!(diff.unknown_ignored_fields));
        doc.insert("timestamp".into(), json!(self.generated_at().to_rfc3339()));
        doc.insert("summary_only".into(), json!(config.summary_only));
        let limit = match config.detail_limit {
            0 => Value::Null,
            n => json!(n),
        };
        doc.insert(
            "detail".into(),
            json!({
                "limit": limit,
                "truncated": {
                    "added": self.is_truncated(diff.added.len()),
                    "removed": self.is_truncated(diff.removed.len()),
                    "updated": self.is_truncated(diff.updates.len()),
                }
            }),
        );
        doc.insert(
            "summary".into(),
            json!({
                "total_previous": s.total_previous,
                "total_current": s.total_current,
                "added": s.added,
                "removed": s.removed,
                "updated": s.updated,
                "unchanged": s.unchanged,
                "duplicate_keys_previous": s.duplicate_keys_previous,
                "duplicate_keys_current": s.duplicate_keys_current,
                "invalid_rows_previous": s.invalid_rows_previous,
                "invalid_rows_current": s.invalid_rows_current,
                "net_change": s.net_change,
                "net_change_pct_previous": rounded(s.net_change_pct_previous),
            }),
        );
        doc.insert(
            "change_rates".into(),
            json!({
                "added_pct_current": rounded(s.added_pct_current),
                "removed_pct_previous": rounded(s.removed_pct_previous),
                "updated_pct_shared": rounded(s.updated_pct_shared),
                "unchanged_pct_shared": rounded(s.unchanged_pct_shared),
            }),
        );

        if config.summary_only {
            return Value::Object(doc);
        }

        doc.insert(
            "column_changes".into(),
            json!({
                "added": diff.added_columns,
                "removed": diff.removed_columns,
            }),
        );
        doc.insert("field_change_counts".into(), counts_object(self.field_change_counts()));
        doc.insert(
            "duplicate_key_values".into(),
            json!({
                "previous": sorted_keys(self.previous().duplicate_keys()),
                "current": sorted_keys(self.current().duplicate_keys()),
            }),
        );
        doc.insert(
            "missing_key_counts".into(),
            json!({
                "previous": counts_object(self.missing_key_counts_previous()),
                "current": counts_object(self.missing_key_counts_current()),
            }),
        );
        doc.insert(
            "invalid_rows".into(),
            json!({
                "previous": self.previous().invalid_lines(),
                "current": self.current().invalid_lines(),
            }),
        );
        doc.insert(
            "field_completeness".into(),
            json!({
                "previous": completeness_object(self.completeness_previous()),
                "current": completeness_object(self.completeness_current()),
            }),
        );
        doc.insert("added".into(), self.key_list(&diff.added));
        doc.insert("removed".into(), self.key_list(&diff.removed));

        let updated: Vec<Value> = diff
            .updates
            .iter()
            .take(self.shown(diff.updates.len()))
            .map(|update| {
                let changes: Map<String, Value> = update
                    .changes
                    .iter()
                    .map(|(field, change)| {
                        (field.clone(), json!({ "before": change.before, "after": change.after }))
                    })
                    .collect();
                json!({ "key": update.key.to_string(), "changes": changes })
            })
            .collect();
        doc.insert("updated".into(), Value::Array(updated));

        Value::Object(doc)
    }

    fn key_list(&self, keys: &[CompositeKey]) -> Value {
        keys.iter()
            .take(self.shown(keys.len()))
            .map(|k| Value::String(k.to_string()))
            .collect()
    }
}

fn rounded(pct: Option<f64>) -> Value {
    match pct {
        Some(v) => json!((v * 10_000.0).round() / 10_000.0),
        None => Value::Null,
    }
}

fn sorted_keys(keys: &[CompositeKey]) -> Vec<String> {
    let mut values: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    values.sort();
    values
}

fn counts_object(counts: &[FieldCount]) -> Value {
    counts
        .iter()
        .map(|c| (c.field.clone(), json!(c.count)))
        .collect::<Map<String, Value>>()
        .into()
}

fn completeness_object(fields: &[FieldCompleteness]) -> Value {
    fields
        .iter()
        .map(|c| {
            (
                c.field.clone(),
                json!({ "non_empty": c.non_empty, "total": c.total, "pct": rounded(c.pct) }),
            )
        })
        .collect::<Map<String, Value>>()
        .into()
}

#[cfg(test)]
mod tests {
    use crate::report::tests::{build, config, CURRENT, PREVIOUS};
    use serde_json::{json, Value};

    #[test]
    fn test_json_document() {
        let report = build(PREVIOUS, CURRENT, config());
        let doc: Value = serde_json::from_str(&report.to_json()).unwrap();

        assert_eq!(doc["key_columns"], json!(["email"]));
        assert_eq!(doc["key_normalize"], "none");
        assert_eq!(doc["detail"]["limit"], Value::Null);
        assert_eq!(doc["summary"]["added"], 1);
        assert_eq!(doc["summary"]["net_change_pct_previous"], json!(0.0));
        assert_eq!(doc["change_rates"]["added_pct_current"], json!(50.0));
        assert_eq!(doc["added"], json!(["c@x.com"]));
        assert_eq!(doc["removed"], json!(["b@x.com"]));
        assert_eq!(
            doc["updated"],
            json!([{
                "key": "a@x.com",
                "changes": { "cohort": { "before": "Fall", "after": "Spring" } }
            }])
        );
        assert_eq!(doc["field_completeness"]["previous"]["email"]["total"], 2);
    }

    #[test]
    fn test_json_key_order_follows_text() {
        let json = build(PREVIOUS, CURRENT, config()).to_json();
        let summary = json.find("\"summary\"").unwrap();
        let rates = json.find("\"change_rates\"").unwrap();
        let added = json.find("\"added\": [").unwrap();
        let updated = json.find("\"updated\": [").unwrap();
        assert!(summary < rates && rates < added && added < updated);
    }

    #[test]
    fn test_truncated_flags() {
        let mut cfg = config();
        cfg.detail_limit = 1;
        let previous = "email,cohort\nz@x.com,F\n";
        let report = build(previous, "email,cohort\nb@x.com,F\na@x.com,F\n", cfg);
        let doc: Value = serde_json::from_str(&report.to_json()).unwrap();

        assert_eq!(doc["detail"]["limit"], 1);
        assert_eq!(doc["detail"]["truncated"]["added"], true);
        assert_eq!(doc["detail"]["truncated"]["removed"], false);
        assert_eq!(doc["detail"]["truncated"]["updated"], false);
        assert_eq!(doc["added"], json!(["a@x.com"]));
        assert_eq!(doc["summary"]["added"], 2);
    }

    #[test]
    fn test_summary_only_omits_details() {
        let mut cfg = config();
        cfg.summary_only = true;
        let doc = build(PREVIOUS, CURRENT, cfg).to_json_value();

        assert_eq!(doc["summary_only"], true);
        assert_eq!(doc["summary"]["updated"], 1);
        assert!(doc.get("added").is_none());
        assert!(doc.get("updated").is_none());
    }

    #[test]
    fn test_null_ratios_and_escaping() {
        let current = "email,note\n\"q\"\"uote@x.com\",\"line\\back\"\n";
        let report = build("email,note\n", current, config());
        let json = report.to_json();
        let doc: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(doc["summary"]["net_change_pct_previous"], Value::Null);
        assert_eq!(doc["change_rates"]["updated_pct_shared"], Value::Null);
        assert_eq!(doc["added"][0], "q\"uote@x.com");
        assert!(json.contains(r#""q\"uote@x.com""#));
    }
}
