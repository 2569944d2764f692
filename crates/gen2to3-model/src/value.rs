//! Scalar values carried by data IDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single data ID value.
///
/// Gen2 repositories mix integer keys (`visit`, `ccd`, `tract`) with string
/// keys (`filter`, `pointing` names). The two kinds never compare equal, so
/// `16` and `"16"` are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataIdValue {
    Int(i64),
    Str(String),
}

impl DataIdValue {
    /// Parse a textual value, preferring an integer when the text is one.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => Self::Int(value),
            Err(_) => Self::Str(trimmed.to_string()),
        }
    }
}

impl fmt::Display for DataIdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for DataIdValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DataIdValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for DataIdValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for DataIdValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(DataIdValue::parse("903334"), DataIdValue::Int(903334));
        assert_eq!(DataIdValue::parse(" -3 "), DataIdValue::Int(-3));
        assert_eq!(
            DataIdValue::parse("HSC-I"),
            DataIdValue::Str("HSC-I".to_string())
        );
    }

    #[test]
    fn int_and_string_never_compare_equal() {
        assert_ne!(DataIdValue::from(16), DataIdValue::from("16"));
    }

    #[test]
    fn display_quotes_strings_only() {
        assert_eq!(DataIdValue::from(16).to_string(), "16");
        assert_eq!(DataIdValue::from("HSC-R2").to_string(), "\"HSC-R2\"");
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![DataIdValue::from(1), DataIdValue::from("a")])
            .expect("serialize values");
        assert_eq!(json, r#"[1,"a"]"#);
        let back: Vec<DataIdValue> = serde_json::from_str(&json).expect("deserialize values");
        assert_eq!(back, vec![DataIdValue::Int(1), DataIdValue::Str("a".into())]);
    }
}
