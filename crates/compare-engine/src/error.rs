//! Error types for the comparison engine.

use std::path::PathBuf;

use compare_core::RecordError;
use compare_store::StoreError;
use thiserror::Error;

/// Errors that end a comparison pass.
///
/// Value mismatches are never errors; they become diff records.
#[derive(Error, Debug)]
pub enum CompareError {
    /// Connection or protocol failure that could not be absorbed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reading or appending a result file failed.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A stale result file could not be removed before a run.
    #[error("Failed to remove stale result file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A worker task panicked or the work queue closed early.
    #[error("Worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, CompareError>;
