use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid dataset type name: {0:?}")]
    InvalidDatasetType(String),
    #[error("invalid instrument name: {0:?}")]
    InvalidInstrument(String),
    #[error("invalid data ID key: {0:?}")]
    InvalidKey(String),
    #[error("malformed data ID pair {0:?} (expected KEY=VALUE)")]
    MalformedPair(String),
    #[error("data ID key {0} appears more than once")]
    DuplicateKey(String),
}
