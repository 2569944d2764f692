//! Key handlers: the closed set of transformations a rule can perform.

use std::fmt;

use gen2to3_model::{DataIdValue, LegacyDataId};
use serde::Serialize;

/// What a rule emits when it fires.
///
/// Each variant emits exactly one `(dimension, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyHandler {
    /// Always emit `target = value`, ignoring the legacy data ID.
    Constant { target: String, value: DataIdValue },
    /// Emit `target = data_id[source]`.
    Copy { target: String, source: String },
}

/// The legacy key a copy handler needed was not present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSourceKey(pub String);

impl KeyHandler {
    pub fn constant(target: impl Into<String>, value: impl Into<DataIdValue>) -> Self {
        Self::Constant {
            target: target.into(),
            value: value.into(),
        }
    }

    /// Copy a legacy key to a dimension of the same name.
    pub fn copy(target: impl Into<String>) -> Self {
        let target = target.into();
        Self::Copy {
            source: target.clone(),
            target,
        }
    }

    /// Copy a legacy key to a differently named dimension.
    pub fn copy_from(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self::Copy {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Constant { target, .. } | Self::Copy { target, .. } => target,
        }
    }

    /// Legacy key read by the handler, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Constant { .. } => None,
            Self::Copy { source, .. } => Some(source),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "constant",
            Self::Copy { .. } => "copy",
        }
    }

    pub fn emit(&self, data_id: &LegacyDataId) -> Result<DataIdValue, MissingSourceKey> {
        match self {
            Self::Constant { value, .. } => Ok(value.clone()),
            Self::Copy { source, .. } => data_id
                .get(source)
                .cloned()
                .ok_or_else(|| MissingSourceKey(source.clone())),
        }
    }
}

impl fmt::Display for KeyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { target, value } => write!(f, "constant({target} = {value})"),
            Self::Copy { target, source } if target == source => write!(f, "copy({target})"),
            Self::Copy { target, source } => write!(f, "copy({target} <- {source})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_input() {
        let handler = KeyHandler::constant("instrument", "HSC");
        assert_eq!(
            handler.emit(&LegacyDataId::new()),
            Ok(DataIdValue::from("HSC"))
        );
        assert_eq!(handler.source(), None);
    }

    #[test]
    fn copy_reads_source_key() {
        let data_id = LegacyDataId::new().with("visit", 903334);
        let handler = KeyHandler::copy_from("exposure", "visit");
        assert_eq!(handler.target(), "exposure");
        assert_eq!(handler.emit(&data_id), Ok(DataIdValue::Int(903334)));
    }

    #[test]
    fn copy_without_source_fails() {
        let handler = KeyHandler::copy("visit");
        assert_eq!(
            handler.emit(&LegacyDataId::new().with("ccd", 1)),
            Err(MissingSourceKey("visit".to_string()))
        );
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(
            KeyHandler::constant("instrument", "HSC").to_string(),
            r#"constant(instrument = "HSC")"#
        );
        assert_eq!(KeyHandler::copy("visit").to_string(), "copy(visit)");
        assert_eq!(
            KeyHandler::copy_from("detector", "ccd").to_string(),
            "copy(detector <- ccd)"
        );
    }
}
