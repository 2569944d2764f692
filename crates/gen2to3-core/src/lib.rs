#![deny(unsafe_code)]

//! Conversion of a walked Gen2 repository into Gen3 datasets.
//!
//! [`ConversionDriver`] ties the pieces together: records come from a
//! walker, identifiers from a sealed [`gen2to3_translate::RuleSet`], and
//! storage goes through the [`DatasetWriter`] trait.

pub mod cancel;
pub mod driver;
pub mod error;
pub mod report;
pub mod writer;

pub use cancel::CancelFlag;
pub use driver::{ConversionDriver, ConvertOptions, DEFAULT_BATCH_SIZE};
pub use error::ConvertError;
pub use report::{ConversionReport, DatasetTypeCounts, FailureStage, RecordFailure};
pub use writer::{DatasetRef, DatasetWriter};
