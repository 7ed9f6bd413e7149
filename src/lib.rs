//! evalstat - Descriptive statistics and paired comparison for scored
//! experiment outcomes
//!
//! This library computes single-population statistics for numeric, nominal
//! and ordinal scores, and paired comparisons between two experiments scored
//! on the same dataset rows, in a single streaming pass per score.

pub mod aggregate;
pub mod cancel;
pub mod cli;
pub mod coder;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod report;
pub mod source;
pub mod stats;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, MetadataError, SourceError};
