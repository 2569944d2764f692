use std::path::PathBuf;

use gen2to3_model::{DataIdValue, DatasetTypeName};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("source root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid template for {dataset_type} ({template}): {message}")]
    Template {
        dataset_type: DatasetTypeName,
        template: String,
        message: String,
    },

    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    #[error("{path}: '{key}' appears as {first} and {second} in the same {dataset_type} path")]
    InconsistentKey {
        path: String,
        dataset_type: DatasetTypeName,
        key: String,
        first: DataIdValue,
        second: DataIdValue,
    },

    #[error("{path}: value {value:?} for '{key}' is not a valid integer")]
    BadInteger {
        path: String,
        key: String,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, WalkError>;
