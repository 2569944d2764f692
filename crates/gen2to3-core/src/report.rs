//! Conversion outcome accounting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use gen2to3_model::{DatasetTypeName, LegacyDataId};
use serde::Serialize;

/// Where in the pipeline a record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    Walk,
    Conflict,
    Unresolved,
    Write,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Conflict => "conflict",
            Self::Unresolved => "unresolved",
            Self::Write => "write",
        }
    }
}

/// One record that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub stage: FailureStage,
    /// Unknown when the walker failed before matching a template.
    pub dataset_type: Option<DatasetTypeName>,
    pub data_id: Option<LegacyDataId>,
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Per dataset type counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetTypeCounts {
    pub translated: usize,
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Records pulled from the walker, including walker failures.
    pub seen: usize,
    pub translated: usize,
    /// Datasets handed to the writer successfully (reserved, for dry runs).
    pub written: usize,
    /// Records of ignored dataset types.
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
    pub by_dataset_type: BTreeMap<DatasetTypeName, DatasetTypeCounts>,
    /// Datasets written per output run.
    pub by_run: BTreeMap<String, usize>,
    pub cancelled: bool,
    pub dry_run: bool,
}

impl ConversionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub(crate) fn counts(&mut self, dataset_type: &DatasetTypeName) -> &mut DatasetTypeCounts {
        self.by_dataset_type
            .entry(dataset_type.clone())
            .or_default()
    }

    pub(crate) fn record_failure(&mut self, failure: RecordFailure) {
        if let Some(dataset_type) = &failure.dataset_type {
            self.counts(dataset_type).failed += 1;
        }
        self.failures.push(failure);
    }
}
