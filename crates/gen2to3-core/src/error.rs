use gen2to3_translate::TranslateError;
use thiserror::Error;

/// Errors that stop a conversion run.
///
/// Per-record problems are collected in the report instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("conversion aborted: {source}")]
    Fatal {
        #[source]
        source: TranslateError,
    },

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("writer failed to flush: {source}")]
    Flush {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
