use std::path::PathBuf;

use thiserror::Error;

use crate::id::DatasetId;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt registry {path} line {line}: {source}")]
    CorruptRegistry {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode registry entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("dataset {dataset_type} {data_id} already registered in run {run} (id {dataset_id})")]
    Duplicate {
        dataset_id: DatasetId,
        run: String,
        dataset_type: String,
        data_id: String,
    },

    #[error("transfer target already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("source has no file name: {path}")]
    MissingFileName { path: PathBuf },

    #[error("unknown transfer mode: {0}")]
    UnknownTransferMode(String),
}

impl WriteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WriteError>;
