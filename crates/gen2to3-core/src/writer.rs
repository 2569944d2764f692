//! Output seam between the driver and a dataset store.

use std::path::Path;

use gen2to3_model::{DatasetTypeName, StructuredIdentifier};

/// A translated dataset ready to be stored.
#[derive(Debug, Clone, Copy)]
pub struct DatasetRef<'a> {
    pub run: &'a str,
    pub dataset_type: &'a DatasetTypeName,
    pub data_id: &'a StructuredIdentifier,
    /// Payload file in the source repository.
    pub source: &'a Path,
}

/// Destination for translated datasets.
///
/// The driver calls the writer from a single thread, in walk order.
pub trait DatasetWriter {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store one dataset.
    fn write(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error>;

    /// Check that `dataset` could be written and remember it, without
    /// touching the destination. Used for dry runs.
    fn reserve(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<W: DatasetWriter + ?Sized> DatasetWriter for &mut W {
    type Error = W::Error;

    fn write(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error> {
        (**self).write(dataset)
    }

    fn reserve(&mut self, dataset: &DatasetRef<'_>) -> Result<(), Self::Error> {
        (**self).reserve(dataset)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}
