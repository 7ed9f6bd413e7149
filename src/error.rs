//! Error taxonomy for the statistics engine
//!
//! Errors are scoped the way the pipeline fails:
//! - metadata errors end the computation for one score only
//! - source errors are I/O failures and are safe to retry by re-invoking
//! - cancellation discards partial state
//!
//! Data-integrity anomalies (a label missing from an ordinal scale) and
//! degenerate inputs (zero rows) are not errors at all; they surface as
//! excluded-row counters and `None` fields on the stats objects.

use thiserror::Error;

/// Errors raised while resolving score metadata
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Score not found: {0}")]
    ScoreNotFound(String),

    #[error("Score {score_id} is {scoring_type} but declares no scale")]
    ScaleMissing {
        score_id: String,
        scoring_type: String,
    },

    #[error("Score {score_id} declares label {label:?} more than once")]
    DuplicateScaleLabel { score_id: String, label: String },

    #[error("Ordinal score {score_id} declares rank {value} more than once")]
    DuplicateScaleValue { score_id: String, value: i64 },

    #[error("Score {score_id} has an unreadable definition: {message}")]
    InvalidDefinition { score_id: String, message: String },
}

/// Errors raised by a scored-value stream source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed score record at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Score source unavailable: {0}")]
    Unavailable(String),

    #[error("Stream not in ascending row-key order: {next} after {previous}")]
    OutOfOrder { previous: u64, next: u64 },
}

/// Top-level errors returned by [`crate::engine::Engine`]
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Computation cancelled before the stream was exhausted")]
    Cancelled,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Statistics worker panicked: {0}")]
    WorkerPanicked(String),
}

impl EngineError {
    /// Whether re-invoking the same request may succeed.
    ///
    /// Only stream I/O failures qualify; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Source(SourceError::Io(_))
                | EngineError::Source(SourceError::Unavailable(_))
        )
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
