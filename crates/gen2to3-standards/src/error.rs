#![deny(unsafe_code)]

use std::path::PathBuf;

use gen2to3_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML catalog {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid catalog {origin}: {message}")]
    InvalidCatalog { origin: String, message: String },

    #[error("invalid rule #{index} in {origin}: {message}")]
    InvalidRule {
        origin: String,
        index: usize,
        message: String,
    },

    #[error("duplicate dataset type {name} in {origin}")]
    DuplicateDatasetType { origin: String, name: String },

    #[error("invalid name in {origin}: {source}")]
    Model {
        origin: String,
        #[source]
        source: ModelError,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn model(origin: &str, source: ModelError) -> Self {
        Self::Model {
            origin: origin.to_string(),
            source,
        }
    }
}
