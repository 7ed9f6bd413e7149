//! Paired numeric comparison: mean delta, win/loss/tie, paired-difference CI
//!
//! Per-side means use the same Welford accumulator as the population
//! aggregator, so `mean_a` equals experiment A's population mean over the
//! joined rows bit-for-bit. Only three accumulators and a tally are kept;
//! memory does not grow with `n_paired`.

use super::{is_significant, OutcomeTally, Outcomes};
use crate::aggregate::ConfidenceInterval;
use crate::config::EngineConfig;
use crate::source::PairedValue;
use crate::stats::{students_t_two_sided_p, Welford};
use serde::Serialize;
use std::cmp::Ordering;

/// Paired t-test on the per-row differences `b - a`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedTTest {
    pub statistic: f64,
    pub df: f64,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericComparison {
    pub n_paired: u64,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    pub std_a: Option<f64>,
    pub std_b: Option<f64>,
    pub delta_mean: Option<f64>,
    #[serde(flatten)]
    pub outcomes: Outcomes,
    pub ci95_delta: Option<ConfidenceInterval>,
    pub paired_t_test: Option<PairedTTest>,
    /// Joined rows dropped because either side was not a number
    pub excluded_rows: u64,
}

/// Single-pass accumulator for [`NumericComparison`]
#[derive(Debug, Clone, Default)]
pub struct NumericComparator {
    a: Welford,
    b: Welford,
    diffs: Welford,
    tally: OutcomeTally,
    excluded_rows: u64,
}

impl NumericComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pair: &PairedValue) {
        let (Some(a), Some(b)) = (pair.raw_a.as_number(), pair.raw_b.as_number()) else {
            tracing::warn!(
                row_key = %pair.row_key,
                raw_a = ?pair.raw_a,
                raw_b = ?pair.raw_b,
                "Excluding non-numeric pair from numeric comparison"
            );
            self.excluded_rows += 1;
            return;
        };

        self.a.push(a);
        self.b.push(b);
        self.diffs.push(b - a);
        // Finite inputs only, so -0.0 and 0.0 tie
        self.tally.record(b.partial_cmp(&a).unwrap_or(Ordering::Equal));
    }

    pub fn finish(self, config: &EngineConfig) -> NumericComparison {
        let n = self.diffs.count();
        let mean_a = self.a.mean();
        let mean_b = self.b.mean();
        let delta_mean = mean_a.zip(mean_b).map(|(a, b)| b - a);

        let diff_std = self.diffs.sample_std();
        let ci95_delta = delta_mean.zip(diff_std).map(|(delta, std)| {
            let half_width = config.z_critical * std / (n as f64).sqrt();
            ConfidenceInterval::from((delta - half_width, delta + half_width))
        });

        let paired_t_test = self
            .diffs
            .mean()
            .zip(diff_std)
            .filter(|&(_, std)| std > 0.0)
            .map(|(mean, std)| {
                let statistic = mean / (std / (n as f64).sqrt());
                let df = (n - 1) as f64;
                let p_value = students_t_two_sided_p(statistic, df);
                PairedTTest {
                    statistic,
                    df,
                    p_value,
                    is_significant: is_significant(p_value, config),
                }
            });

        NumericComparison {
            n_paired: n,
            mean_a,
            mean_b,
            std_a: self.a.sample_std(),
            std_b: self.b.sample_std(),
            delta_mean,
            outcomes: self.tally.finish(),
            ci95_delta,
            paired_t_test,
            excluded_rows: self.excluded_rows,
        }
    }
}
