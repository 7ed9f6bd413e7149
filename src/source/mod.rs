//! Scored-value stream sources
//!
//! Sources hand the engine flat `(row_key, raw)` tuples in ascending row-key
//! order. Nothing richer than a [`ScoredValue`] ever crosses this boundary,
//! which keeps per-row memory at a key plus a number or a short label.
//!
//! Paired populations are produced by a streaming merge-join of two ordered
//! experiment streams ([`join::PairedJoin`]), so joining costs O(1) memory
//! regardless of population size.

pub mod join;
mod memory;

pub use join::PairedJoin;
pub use memory::{InMemorySource, ScoreRecord, ScoreStatus};

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Opaque, totally ordered identifier of a dataset row or experiment result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub u64);

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw score value as stored: a number or a category label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Label(String),
}

impl RawValue {
    /// Numeric reading of the value; labels are parsed leniently
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            RawValue::Number(_) => None,
            RawValue::Label(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Category reading of the value; numbers use their canonical rendering
    pub fn as_label(&self) -> Cow<'_, str> {
        match self {
            RawValue::Label(s) => Cow::Borrowed(s.as_str()),
            RawValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Label(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Label(s)
    }
}

/// One scored row of a single population
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredValue {
    pub row_key: RowKey,
    pub raw: RawValue,
}

/// One dataset row scored by both experiments of a comparison
#[derive(Debug, Clone, PartialEq)]
pub struct PairedValue {
    pub row_key: RowKey,
    pub raw_a: RawValue,
    pub raw_b: RawValue,
}

/// Which rows a population covers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Scores attached directly to dataset rows
    Dataset,
    /// Scores attached to one experiment's results
    Experiment(String),
}

impl Scope {
    pub fn experiment(experiment_id: impl Into<String>) -> Self {
        Scope::Experiment(experiment_id.into())
    }

    pub fn experiment_id(&self) -> Option<&str> {
        match self {
            Scope::Dataset => None,
            Scope::Experiment(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Dataset => f.write_str("dataset"),
            Scope::Experiment(id) => write!(f, "experiment:{}", id),
        }
    }
}

/// Forward-only stream of scored values, ascending by row key
pub type ScoredValueStream<'a> =
    Box<dyn Iterator<Item = Result<ScoredValue, SourceError>> + Send + 'a>;

/// Forward-only stream of paired values, ascending by row key
pub type PairedValueStream<'a> =
    Box<dyn Iterator<Item = Result<PairedValue, SourceError>> + Send + 'a>;

/// Read-only access to materialized score results
///
/// Implementations must only yield rows whose score is complete and non-null,
/// and must yield them in strictly ascending [`RowKey`] order.
pub trait ScoreSource: Send + Sync {
    /// Scores with at least one stored result in this population
    fn score_ids(&self, evaluation_id: &str, scope: &Scope) -> Result<Vec<String>, SourceError>;

    /// Stream one population's scored values
    fn stream_scored_values<'a>(
        &'a self,
        evaluation_id: &str,
        score_id: &str,
        scope: &Scope,
    ) -> Result<ScoredValueStream<'a>, SourceError>;

    /// Stream rows scored by both experiments, inner-joined on row key
    fn stream_paired_scored_values<'a>(
        &'a self,
        evaluation_id: &str,
        score_id: &str,
        experiment_a: &str,
        experiment_b: &str,
    ) -> Result<PairedValueStream<'a>, SourceError> {
        let left =
            self.stream_scored_values(evaluation_id, score_id, &Scope::experiment(experiment_a))?;
        let right =
            self.stream_scored_values(evaluation_id, score_id, &Scope::experiment(experiment_b))?;
        Ok(Box::new(PairedJoin::new(left, right)))
    }
}
