//! Error types for data ID translation.

use gen2to3_model::{DataIdValue, DatasetTypeName, LegacyDataId, StructuredIdentifier};
use thiserror::Error;

/// Errors produced while translating one legacy record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Two applicable rules wrote different values to the same dimension.
    #[error(
        "conflicting values for '{dimension}' in {dataset_type} {data_id}: \
         rule '{first_rule}' set {first_value}, rule '{second_rule}' produced {second_value}"
    )]
    Conflict {
        dataset_type: DatasetTypeName,
        data_id: LegacyDataId,
        dimension: String,
        first_rule: String,
        first_value: DataIdValue,
        second_rule: String,
        second_value: DataIdValue,
    },

    /// Required dimensions were never set by any rule.
    #[error(
        "unresolved {dataset_type} {data_id}: missing dimension(s) {}",
        .missing.join(", ")
    )]
    Unresolved {
        dataset_type: DatasetTypeName,
        data_id: LegacyDataId,
        missing: Vec<String>,
        partial: StructuredIdentifier,
    },

    /// A copy rule matched but its source key is absent; the rule catalog is
    /// inconsistent.
    #[error(
        "rule '{rule}' copies '{source_key}' but {dataset_type} {data_id} has no such key"
    )]
    HandlerInputMissing {
        rule: String,
        source_key: String,
        dataset_type: DatasetTypeName,
        data_id: LegacyDataId,
    },
}

/// Coarse classification used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TranslateErrorKind {
    Conflict,
    Unresolved,
    HandlerInputMissing,
}

impl TranslateErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::Unresolved => "unresolved",
            Self::HandlerInputMissing => "handler-input-missing",
        }
    }
}

impl TranslateError {
    pub fn kind(&self) -> TranslateErrorKind {
        match self {
            Self::Conflict { .. } => TranslateErrorKind::Conflict,
            Self::Unresolved { .. } => TranslateErrorKind::Unresolved,
            Self::HandlerInputMissing { .. } => TranslateErrorKind::HandlerInputMissing,
        }
    }

    /// Fatal errors indicate a broken rule catalog and must stop a conversion
    /// run; the others only fail the record at hand.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HandlerInputMissing { .. })
    }
}
