//! Normalization policies applied before comparison.
//!
//! Raw values are never rewritten: only the normalized copies produced here
//! are compared, so two raw values with equal normalized forms count as equal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// How key-column values are normalized before building a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyNormalize {
    #[default]
    None,
    Lower,
    Upper,
}

impl KeyNormalize {
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            KeyNormalize::None => Cow::Borrowed(value),
            KeyNormalize::Lower => Cow::Owned(value.to_lowercase()),
            KeyNormalize::Upper => Cow::Owned(value.to_uppercase()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyNormalize::None => "none",
            KeyNormalize::Lower => "lower",
            KeyNormalize::Upper => "upper",
        }
    }
}

impl FromStr for KeyNormalize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(KeyNormalize::None),
            "lower" => Ok(KeyNormalize::Lower),
            "upper" => Ok(KeyNormalize::Upper),
            other => Err(ConfigError::InvalidKeyNormalize(other.to_string())),
        }
    }
}

impl fmt::Display for KeyNormalize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How field values are normalized before change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueNormalize {
    #[default]
    None,
    /// Strip leading and trailing whitespace.
    Trim,
    /// Trim, then fold internal whitespace runs to a single space.
    Collapse,
}

impl ValueNormalize {
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            ValueNormalize::None => Cow::Borrowed(value),
            ValueNormalize::Trim => Cow::Borrowed(value.trim()),
            ValueNormalize::Collapse => WHITESPACE_RUN.replace_all(value.trim(), " "),
        }
    }

    /// Compare two raw values under this policy.
    pub fn same(&self, before: &str, after: &str) -> bool {
        self.apply(before) == self.apply(after)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueNormalize::None => "none",
            ValueNormalize::Trim => "trim",
            ValueNormalize::Collapse => "collapse",
        }
    }
}

impl FromStr for ValueNormalize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ValueNormalize::None),
            "trim" => Ok(ValueNormalize::Trim),
            "collapse" => Ok(ValueNormalize::Collapse),
            other => Err(ConfigError::InvalidValueNormalize(other.to_string())),
        }
    }
}

impl fmt::Display for ValueNormalize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalize() {
        assert_eq!(KeyNormalize::Lower.apply("A@X.com"), "a@x.com");
        assert_eq!(KeyNormalize::Upper.apply("a@x.com"), "A@X.COM");
        assert_eq!(KeyNormalize::None.apply("A@x.com"), "A@x.com");
    }

    #[test]
    fn test_key_normalize_rejects_unknown() {
        assert_eq!(
            "title".parse::<KeyNormalize>(),
            Err(ConfigError::InvalidKeyNormalize("title".into()))
        );
        assert_eq!("upper".parse::<KeyNormalize>(), Ok(KeyNormalize::Upper));
    }

    #[test]
    fn test_value_normalize_collapse() {
        assert_eq!(ValueNormalize::Collapse.apply("  John \t Doe  "), "John Doe");
        assert!(ValueNormalize::Collapse.same("John  Doe", "John Doe"));
        assert!(!ValueNormalize::Trim.same("John  Doe", "John Doe"));
    }

    #[test]
    fn test_value_normalize_trim_and_none() {
        assert!(ValueNormalize::Trim.same(" Fall", "Fall "));
        assert!(!ValueNormalize::None.same(" Fall", "Fall"));
    }

    #[test]
    fn test_value_normalize_rejects_unknown() {
        assert!("squash".parse::<ValueNormalize>().is_err());
        assert_eq!("collapse".parse::<ValueNormalize>(), Ok(ValueNormalize::Collapse));
    }
}
