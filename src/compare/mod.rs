//! Paired comparison of two experiments scored on the same dataset rows
//!
//! Input is an inner-joined paired stream: only rows scored by both
//! experiments reach the comparators, and `n_paired` counts exactly those.
//! Win/loss is always B relative to A, with "higher is better".
//!
//! Per-side summaries are produced by the same accumulators the
//! single-population aggregator uses, fed in the same row order, so
//! `mean_a`, `proportion_a`, `cdf_a` and `pass_rate_a` are bit-identical to
//! experiment A's population statistics over the joined rows.

mod nominal;
mod numeric;
mod ordinal;

pub use nominal::{
    BowkerTest, CategoryComparison, ContingencyCell, NominalComparator, NominalComparison,
};
pub use numeric::{NumericComparator, NumericComparison, PairedTTest};
pub use ordinal::{
    CdfComparison, DeltaPassRate, OrdinalComparator, OrdinalComparison, WilcoxonTest,
};

use crate::aggregate::{checked, not_cancelled};
use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{Result, SourceError};
use crate::metadata::{ScoreMetadata, ScoringType};
use crate::source::PairedValue;
use crate::stats::proportion;
use serde::Serialize;
use std::cmp::Ordering;

/// Win/loss/tie tally from B's perspective
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Outcomes {
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub tie_rate: f64,
}

/// Running tally behind [`Outcomes`]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OutcomeTally {
    wins: u64,
    losses: u64,
    ties: u64,
}

impl OutcomeTally {
    /// Classify one pair; `ordering` is `b.cmp(a)`
    pub(crate) fn record(&mut self, ordering: Ordering) {
        match ordering {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.ties += 1,
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.wins + self.losses + self.ties
    }

    pub(crate) fn finish(self) -> Outcomes {
        let n = self.total();
        Outcomes {
            wins: self.wins,
            losses: self.losses,
            ties: self.ties,
            win_rate: proportion(self.wins, n),
            loss_rate: proportion(self.losses, n),
            tie_rate: proportion(self.ties, n),
        }
    }

    /// Cliff's delta, `(wins - losses) / n`
    pub(crate) fn cliffs_delta(&self) -> Option<f64> {
        let n = self.total();
        (n > 0).then(|| (self.wins as f64 - self.losses as f64) / n as f64)
    }

    /// P(B > A) + 0.5 * P(B == A)
    pub(crate) fn probability_of_superiority(&self) -> Option<f64> {
        let n = self.total();
        (n > 0).then(|| (self.wins as f64 + 0.5 * self.ties as f64) / n as f64)
    }
}

/// Whether a p-value clears the configured significance level
pub(crate) fn is_significant(p_value: Option<f64>, config: &EngineConfig) -> bool {
    p_value.is_some_and(|p| p < config.significance_level)
}

/// Paired comparison result for one score; exactly one body is populated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonStats {
    pub experiment_id_a: String,
    pub experiment_id_b: String,
    pub score_id: String,
    pub scoring_type: ScoringType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal: Option<NominalComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<OrdinalComparison>,
}

impl ComparisonStats {
    pub fn n_paired(&self) -> u64 {
        if let Some(c) = &self.numeric {
            c.n_paired
        } else if let Some(c) = &self.nominal {
            c.n_paired
        } else if let Some(c) = &self.ordinal {
            c.n_paired
        } else {
            0
        }
    }
}

/// Compare two experiments over a paired stream in a single pass
///
/// Fails atomically: a source error or cancellation yields no result.
pub fn compare_paired<I>(
    metadata: &ScoreMetadata,
    experiment_a: &str,
    experiment_b: &str,
    pairs: I,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<ComparisonStats>
where
    I: IntoIterator<Item = std::result::Result<PairedValue, SourceError>>,
{
    let mut stats = ComparisonStats {
        experiment_id_a: experiment_a.to_string(),
        experiment_id_b: experiment_b.to_string(),
        score_id: metadata.score_id.clone(),
        scoring_type: metadata.scoring_type,
        numeric: None,
        nominal: None,
        ordinal: None,
    };

    match metadata.scoring_type {
        ScoringType::Numeric | ScoringType::Ragas => {
            let mut comparator = NumericComparator::new();
            for pair in pairs {
                comparator.push(&checked(pair, cancel)?);
            }
            stats.numeric = Some(comparator.finish(config));
        }
        ScoringType::Nominal => {
            let mut comparator = NominalComparator::new(metadata);
            for pair in pairs {
                comparator.push(&checked(pair, cancel)?);
            }
            stats.nominal = Some(comparator.finish(config));
        }
        ScoringType::Ordinal => {
            let mut comparator = OrdinalComparator::new(metadata);
            for pair in pairs {
                comparator.push(&checked(pair, cancel)?);
            }
            stats.ordinal = Some(comparator.finish(config));
        }
    }
    not_cancelled(cancel)?;

    tracing::debug!(
        score_id = %metadata.score_id,
        experiment_a,
        experiment_b,
        n_paired = stats.n_paired(),
        "Compared paired populations"
    );
    Ok(stats)
}
