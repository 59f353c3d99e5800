//! Configuration parsing and validation.
//!
//! Everything here runs before any file is read; a rejected value aborts
//! the run with a [`ConfigError`].
//!
//! # Example
//!
//! ```
//! use roster_reconciler::validation::{parse_detail_limit, parse_key_columns};
//!
//! assert_eq!(parse_key_columns(Some(" email , cohort ")), vec!["email", "cohort"]);
//! assert_eq!(parse_key_columns(None), vec!["email"]);
//! assert_eq!(parse_detail_limit("25"), Ok(25));
//! assert!(parse_detail_limit("-1").is_err());
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::{ConfigError, ConfigResult};

/// Key column used when none is configured.
pub const DEFAULT_KEY_COLUMN: &str = "email";

static APP_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static app name pattern"));

/// Split a comma-separated list, trimming entries and dropping blanks.
fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Ordered key columns; falls back to [`DEFAULT_KEY_COLUMN`] when nothing
/// usable is given.
pub fn parse_key_columns(raw: Option<&str>) -> Vec<String> {
    let columns: Vec<String> = raw.map(|r| split_list(r).collect()).unwrap_or_default();
    if columns.is_empty() {
        vec![DEFAULT_KEY_COLUMN.to_string()]
    } else {
        columns
    }
}

pub fn parse_ignored_fields(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|r| split_list(r).collect()).unwrap_or_default()
}

/// Parse a detail limit; blank means unlimited (0).
pub fn parse_detail_limit(raw: &str) -> ConfigResult<usize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ConfigError::InvalidDetailLimit(raw.to_string()))?;
    usize::try_from(value).map_err(|_| ConfigError::InvalidDetailLimit(raw.to_string()))
}

pub fn validate_key_columns(columns: &[String]) -> ConfigResult<()> {
    if columns.is_empty() {
        return Err(ConfigError::EmptyKeyColumns);
    }
    Ok(())
}

/// App names label stored runs: letters, digits, `_` and `-`, not starting
/// with a digit or dash.
pub fn validate_app_name(name: &str) -> ConfigResult<()> {
    if APP_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAppName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_columns_default() {
        assert_eq!(parse_key_columns(None), vec!["email"]);
        assert_eq!(parse_key_columns(Some(" , ,")), vec!["email"]);
        assert_eq!(parse_key_columns(Some("last,first")), vec!["last", "first"]);
    }

    #[test]
    fn test_ignored_fields() {
        let ignored = parse_ignored_fields(Some("notes, updated_at ,,notes"));
        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains("notes"));
        assert!(ignored.contains("updated_at"));
        assert!(parse_ignored_fields(None).is_empty());
    }

    #[test]
    fn test_detail_limit() {
        assert_eq!(parse_detail_limit(""), Ok(0));
        assert_eq!(parse_detail_limit(" 10 "), Ok(10));
        assert_eq!(parse_detail_limit("0"), Ok(0));
        assert_eq!(
            parse_detail_limit("-5"),
            Err(ConfigError::InvalidDetailLimit("-5".into()))
        );
        assert!(parse_detail_limit("ten").is_err());
    }

    #[test]
    fn test_app_name() {
        assert!(validate_app_name("roster-reconciler").is_ok());
        assert!(validate_app_name("_nightly2").is_ok());
        assert!(validate_app_name("9lives").is_err());
        assert!(validate_app_name("drop table;").is_err());
        assert!(validate_app_name("").is_err());
    }

    #[test]
    fn test_empty_key_columns_rejected() {
        assert_eq!(validate_key_columns(&[]), Err(ConfigError::EmptyKeyColumns));
        assert!(validate_key_columns(&["email".to_string()]).is_ok());
    }
}
