//! Data identifier model shared by the translation engine, walker and writer.

pub mod data_id;
pub mod error;
pub mod ids;
pub mod value;

pub use data_id::{LegacyDataId, LegacyRecord, StructuredIdentifier};
pub use error::ModelError;
pub use ids::{DatasetTypeName, InstrumentName};
pub use value::DataIdValue;
