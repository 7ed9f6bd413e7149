//! Ordinal population statistics: CDF, percentile categories, pass rate
//!
//! Counts are kept for every declared scale code (zero-count codes included),
//! so memory is bounded by the scale size. Percentile lookups compare
//! integer cumulative counts (`cumulative * 100 >= pct * n`) to avoid
//! floating-point edge effects at exact boundaries.

use crate::coder::CategoryCoder;
use crate::metadata::ScoreMetadata;
use crate::source::{RawValue, RowKey};
use crate::stats::proportion;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Share of rows meeting the ordinal pass criteria
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRate {
    pub proportion: f64,
    pub passed: u64,
    pub acceptable_set: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_rank: Option<i64>,
}

/// Descriptive statistics of an ordinal population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrdinalStats {
    pub n_scored: u64,
    pub counts_by_code: BTreeMap<i64, u64>,
    pub proportions_by_code: BTreeMap<i64, f64>,
    /// Cumulative share at or below each declared code
    pub cdf: BTreeMap<i64, f64>,
    pub pass_rate: PassRate,
    /// `"pX"` → label of the smallest category whose CDF reaches X%
    pub percentile_categories: BTreeMap<String, String>,
    pub median_category: Option<String>,
    pub labels_by_code: BTreeMap<i64, String>,
    /// Rows whose label is not on the declared scale
    pub excluded_rows: u64,
}

/// Which codes count as "pass"
#[derive(Debug, Clone, Default)]
struct PassCriteria {
    acceptable_codes: BTreeSet<i64>,
    acceptable_set: Vec<String>,
    threshold_rank: Option<i64>,
}

impl PassCriteria {
    fn from_metadata(metadata: &ScoreMetadata, coder: &CategoryCoder) -> Self {
        let config = metadata.ordinal_config.clone().unwrap_or_default();
        let acceptable_set = config.acceptable_set.unwrap_or_default();

        let mut acceptable_codes = BTreeSet::new();
        for label in &acceptable_set {
            match coder.labels().iter().find(|(_, l)| *l == label) {
                Some((&code, _)) => {
                    acceptable_codes.insert(code);
                }
                None => tracing::warn!(
                    score_id = %metadata.score_id,
                    label = %label,
                    "Acceptable label is not on the declared scale"
                ),
            }
        }

        Self {
            acceptable_codes,
            acceptable_set,
            threshold_rank: config.threshold_rank,
        }
    }

    fn passes(&self, code: i64) -> bool {
        self.acceptable_codes.contains(&code) || self.threshold_rank.is_some_and(|t| code >= t)
    }
}

/// Single-pass accumulator for [`OrdinalStats`]
#[derive(Debug, Clone)]
pub struct OrdinalAccumulator {
    counts: BTreeMap<i64, u64>,
    n_scored: u64,
    passed: u64,
    excluded_rows: u64,
    criteria: PassCriteria,
}

impl OrdinalAccumulator {
    /// Accumulator over the declared scale of `coder`
    pub fn new(metadata: &ScoreMetadata, coder: &CategoryCoder) -> Self {
        Self {
            counts: coder.labels().keys().map(|&code| (code, 0)).collect(),
            n_scored: 0,
            passed: 0,
            excluded_rows: 0,
            criteria: PassCriteria::from_metadata(metadata, coder),
        }
    }

    /// Count a code; returns false (and counts nothing) for off-scale codes
    pub fn push_code(&mut self, code: i64) -> bool {
        let Some(count) = self.counts.get_mut(&code) else {
            return false;
        };
        *count += 1;
        self.n_scored += 1;
        if self.criteria.passes(code) {
            self.passed += 1;
        }
        true
    }

    /// Code a raw value and count it, excluding (and logging) off-scale labels
    pub fn push_raw(
        &mut self,
        coder: &mut CategoryCoder,
        row_key: RowKey,
        raw: &RawValue,
    ) -> Option<i64> {
        match coder.code_of(raw).filter(|&code| self.push_code(code)) {
            Some(code) => Some(code),
            None => {
                self.exclude(row_key, raw);
                None
            }
        }
    }

    /// Record a row dropped for a data-integrity anomaly
    pub fn exclude(&mut self, row_key: RowKey, raw: &RawValue) {
        tracing::warn!(%row_key, ?raw, "Excluding label absent from ordinal scale");
        self.excluded_rows += 1;
    }

    pub fn n_scored(&self) -> u64 {
        self.n_scored
    }

    pub fn finish(self, coder: &CategoryCoder, percentiles: &[u8]) -> OrdinalStats {
        let n = self.n_scored;

        let mut cumulative = 0u64;
        let mut cumulative_counts = Vec::with_capacity(self.counts.len());
        let mut cdf = BTreeMap::new();
        for (&code, &count) in &self.counts {
            cumulative += count;
            cumulative_counts.push((code, cumulative));
            cdf.insert(code, proportion(cumulative, n));
        }

        let category_at = |pct: u8| -> Option<String> {
            if n == 0 {
                return None;
            }
            cumulative_counts
                .iter()
                .find(|&&(_, cum)| cum * 100 >= u64::from(pct) * n)
                .and_then(|&(code, _)| coder.label_of(code))
                .map(str::to_string)
        };

        let percentile_categories = percentiles
            .iter()
            .filter_map(|&pct| category_at(pct).map(|label| (format!("p{}", pct), label)))
            .collect();

        OrdinalStats {
            n_scored: n,
            proportions_by_code: self
                .counts
                .iter()
                .map(|(&code, &count)| (code, proportion(count, n)))
                .collect(),
            cdf,
            pass_rate: PassRate {
                proportion: proportion(self.passed, n),
                passed: self.passed,
                acceptable_set: self.criteria.acceptable_set,
                threshold_rank: self.criteria.threshold_rank,
            },
            percentile_categories,
            median_category: category_at(50),
            labels_by_code: coder.labels().clone(),
            excluded_rows: self.excluded_rows,
            counts_by_code: self.counts,
        }
    }
}
