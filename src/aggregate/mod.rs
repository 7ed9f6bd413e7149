//! Single-population aggregation
//!
//! One pass over a scored-value stream produces the type-specific
//! [`PopulationStats`]. The accumulators are public because the paired
//! comparator reuses them: feeding the same accumulator type the same rows in
//! the same order is what makes single-population and comparison values
//! bit-identical.

mod nominal;
mod numeric;
mod ordinal;

pub use nominal::{NominalAccumulator, NominalStats};
pub use numeric::{NumericAccumulator, NumericStats};
pub use ordinal::{OrdinalAccumulator, OrdinalStats, PassRate};

use crate::cancel::CancellationToken;
use crate::coder::CategoryCoder;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, SourceError};
use crate::metadata::{ScoreMetadata, ScoringType};
use crate::source::ScoredValue;
use serde::Serialize;

/// Two-sided confidence interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl From<(f64, f64)> for ConfidenceInterval {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self { lower, upper }
    }
}

/// Statistics of one scored population, by scoring type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PopulationStats {
    Numeric(NumericStats),
    Nominal(NominalStats),
    Ordinal(OrdinalStats),
}

impl PopulationStats {
    pub fn n_scored(&self) -> u64 {
        match self {
            PopulationStats::Numeric(s) => s.n_scored,
            PopulationStats::Nominal(s) => s.n_scored,
            PopulationStats::Ordinal(s) => s.n_scored,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericStats> {
        match self {
            PopulationStats::Numeric(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_nominal(&self) -> Option<&NominalStats> {
        match self {
            PopulationStats::Nominal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ordinal(&self) -> Option<&OrdinalStats> {
        match self {
            PopulationStats::Ordinal(s) => Some(s),
            _ => None,
        }
    }
}

/// Aggregate one population in a single pass
///
/// `values` must be ascending by row key for nominal codes to be
/// reproducible. A source error or cancellation aborts the pass and drops
/// everything accumulated so far.
pub fn aggregate_population<I>(
    metadata: &ScoreMetadata,
    values: I,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<PopulationStats>
where
    I: IntoIterator<Item = std::result::Result<ScoredValue, SourceError>>,
{
    let mut coder = CategoryCoder::for_metadata(metadata);

    let stats = match metadata.scoring_type {
        ScoringType::Numeric | ScoringType::Ragas => {
            let mut acc = NumericAccumulator::new();
            for value in values {
                let value = checked(value, cancel)?;
                acc.push_raw(value.row_key, &value.raw);
            }
            PopulationStats::Numeric(acc.finish(config))
        }
        ScoringType::Nominal => {
            let mut acc = NominalAccumulator::new();
            for value in values {
                let value = checked(value, cancel)?;
                acc.push_raw(&mut coder, &value.raw);
            }
            PopulationStats::Nominal(acc.finish(&coder))
        }
        ScoringType::Ordinal => {
            let mut acc = OrdinalAccumulator::new(metadata, &coder);
            for value in values {
                let value = checked(value, cancel)?;
                acc.push_raw(&mut coder, value.row_key, &value.raw);
            }
            PopulationStats::Ordinal(acc.finish(&coder, &config.ordinal_percentiles))
        }
    };
    // An empty stream never reaches `checked`
    not_cancelled(cancel)?;

    tracing::debug!(
        score_id = %metadata.score_id,
        scoring_type = %metadata.scoring_type,
        n_scored = stats.n_scored(),
        "Aggregated population"
    );
    Ok(stats)
}

pub(crate) fn not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

/// Unwrap a stream item, honouring cancellation first
pub(crate) fn checked<T>(
    item: std::result::Result<T, SourceError>,
    cancel: &CancellationToken,
) -> Result<T> {
    not_cancelled(cancel)?;
    Ok(item?)
}
