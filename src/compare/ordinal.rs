//! Paired ordinal comparison: pass-rate and CDF deltas, Wilcoxon signed-rank,
//! Cliff's delta and probability of superiority
//!
//! Wilcoxon ranks are derived from a histogram of `|code_b − code_a|`. Codes
//! live on a small declared scale, so the histogram has at most a handful of
//! buckets and ranking costs no per-row memory.

use super::{is_significant, OutcomeTally, Outcomes};
use crate::aggregate::{OrdinalAccumulator, OrdinalStats};
use crate::coder::CategoryCoder;
use crate::config::EngineConfig;
use crate::metadata::ScoreMetadata;
use crate::source::PairedValue;
use crate::stats::normal_two_sided_p;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pass rate of each experiment and B's improvement over A
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaPassRate {
    pub pass_rate_a: f64,
    pub pass_rate_b: f64,
    pub delta: f64,
}

/// CDF value of one category on each side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdfComparison {
    pub code: i64,
    pub cdf_a: f64,
    pub cdf_b: f64,
}

/// Wilcoxon signed-rank test on `code_b − code_a`, normal approximation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WilcoxonTest {
    /// Pairs with a non-zero difference (the ranked sample)
    pub n_nonzero: u64,
    pub w_plus: f64,
    pub w_minus: f64,
    /// `min(W+, W−)`
    pub statistic: f64,
    pub z: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrdinalComparison {
    pub n_paired: u64,
    pub delta_pass_rate: DeltaPassRate,
    /// Keyed by category label
    pub cdf_comparison: BTreeMap<String, CdfComparison>,
    #[serde(flatten)]
    pub outcomes: Outcomes,
    pub wilcoxon: WilcoxonTest,
    pub cliffs_delta: Option<f64>,
    pub probability_of_superiority: Option<f64>,
    /// Joined rows dropped because either label is off the declared scale
    pub excluded_rows: u64,
}

/// Count of differences sharing one absolute value
#[derive(Debug, Clone, Copy, Default)]
struct RankBucket {
    count: u64,
    positive: u64,
}

/// Single-pass accumulator for [`OrdinalComparison`]
#[derive(Debug, Clone)]
pub struct OrdinalComparator {
    coder: CategoryCoder,
    a: OrdinalAccumulator,
    b: OrdinalAccumulator,
    tally: OutcomeTally,
    abs_diffs: BTreeMap<u64, RankBucket>,
    excluded_rows: u64,
}

impl OrdinalComparator {
    pub fn new(metadata: &ScoreMetadata) -> Self {
        let coder = CategoryCoder::for_metadata(metadata);
        Self {
            a: OrdinalAccumulator::new(metadata, &coder),
            b: OrdinalAccumulator::new(metadata, &coder),
            coder,
            tally: OutcomeTally::default(),
            abs_diffs: BTreeMap::new(),
            excluded_rows: 0,
        }
    }

    pub fn push(&mut self, pair: &PairedValue) {
        let (Some(code_a), Some(code_b)) = (
            self.coder.code_of(&pair.raw_a),
            self.coder.code_of(&pair.raw_b),
        ) else {
            tracing::warn!(
                row_key = %pair.row_key,
                raw_a = ?pair.raw_a,
                raw_b = ?pair.raw_b,
                "Excluding pair with label absent from ordinal scale"
            );
            self.excluded_rows += 1;
            return;
        };

        self.a.push_code(code_a);
        self.b.push_code(code_b);
        self.tally.record(code_b.cmp(&code_a));

        // Declared ranks may span the whole i64 range; |b - a| always fits u64
        if code_b != code_a {
            let bucket = self.abs_diffs.entry(code_b.abs_diff(code_a)).or_default();
            bucket.count += 1;
            if code_b > code_a {
                bucket.positive += 1;
            }
        }
    }

    pub fn finish(self, config: &EngineConfig) -> OrdinalComparison {
        let stats_a = self.a.finish(&self.coder, &config.ordinal_percentiles);
        let stats_b = self.b.finish(&self.coder, &config.ordinal_percentiles);

        OrdinalComparison {
            n_paired: stats_a.n_scored,
            delta_pass_rate: DeltaPassRate {
                pass_rate_a: stats_a.pass_rate.proportion,
                pass_rate_b: stats_b.pass_rate.proportion,
                delta: stats_b.pass_rate.proportion - stats_a.pass_rate.proportion,
            },
            cdf_comparison: cdf_comparison(&stats_a, &stats_b),
            outcomes: self.tally.finish(),
            wilcoxon: wilcoxon_signed_rank(&self.abs_diffs, config),
            cliffs_delta: self.tally.cliffs_delta(),
            probability_of_superiority: self.tally.probability_of_superiority(),
            excluded_rows: self.excluded_rows,
        }
    }
}

fn cdf_comparison(a: &OrdinalStats, b: &OrdinalStats) -> BTreeMap<String, CdfComparison> {
    a.labels_by_code
        .iter()
        .map(|(&code, label)| {
            (
                label.clone(),
                CdfComparison {
                    code,
                    cdf_a: a.cdf.get(&code).copied().unwrap_or(0.0),
                    cdf_b: b.cdf.get(&code).copied().unwrap_or(0.0),
                },
            )
        })
        .collect()
}

/// Signed-rank test from the `|diff|` histogram
///
/// Zero differences are already excluded. Tied `|diff|` values share their
/// midrank; the variance carries the `Σ(t³ − t)/48` tie correction.
fn wilcoxon_signed_rank(
    abs_diffs: &BTreeMap<u64, RankBucket>,
    config: &EngineConfig,
) -> WilcoxonTest {
    let mut rank_offset = 0.0;
    let mut w_plus = 0.0;
    let mut w_minus = 0.0;
    let mut tie_term = 0.0;
    let mut n = 0u64;

    for bucket in abs_diffs.values() {
        let t = bucket.count as f64;
        let midrank = rank_offset + (t + 1.0) / 2.0;
        w_plus += midrank * bucket.positive as f64;
        w_minus += midrank * (bucket.count - bucket.positive) as f64;
        tie_term += t * t * t - t;
        rank_offset += t;
        n += bucket.count;
    }

    let n_f = n as f64;
    let mean = n_f * (n_f + 1.0) / 4.0;
    let variance = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_term / 48.0;

    let z = (n > 0 && variance > 0.0).then(|| {
        let mut deviation = w_plus - mean;
        if config.continuity_correction {
            deviation = deviation.signum() * (deviation.abs() - 0.5).max(0.0);
        }
        deviation / variance.sqrt()
    });
    let p_value = z.and_then(normal_two_sided_p);

    WilcoxonTest {
        n_nonzero: n,
        w_plus,
        w_minus,
        statistic: w_plus.min(w_minus),
        z,
        p_value,
        is_significant: is_significant(p_value, config),
    }
}
