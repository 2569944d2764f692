//! Required-dimension lookup supplied by the caller.

use std::collections::BTreeMap;

use gen2to3_model::DatasetTypeName;

/// Source of the dimensions each dataset type must end up with.
///
/// The translator never decides this itself; unknown dataset types have no
/// requirements.
pub trait DimensionSchema {
    fn required_dimensions(&self, dataset_type: &DatasetTypeName) -> Vec<&str>;
}

/// Schema with no requirements at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequirements;

impl DimensionSchema for NoRequirements {
    fn required_dimensions(&self, _dataset_type: &DatasetTypeName) -> Vec<&str> {
        Vec::new()
    }
}

impl DimensionSchema for BTreeMap<DatasetTypeName, Vec<String>> {
    fn required_dimensions(&self, dataset_type: &DatasetTypeName) -> Vec<&str> {
        self.get(dataset_type)
            .map(|dims| dims.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl<T: DimensionSchema + ?Sized> DimensionSchema for &T {
    fn required_dimensions(&self, dataset_type: &DatasetTypeName) -> Vec<&str> {
        (**self).required_dimensions(dataset_type)
    }
}
