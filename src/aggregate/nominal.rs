//! Nominal population statistics: counts, proportions, mode

use crate::coder::CategoryCoder;
use crate::source::RawValue;
use crate::stats::proportion;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Descriptive statistics of a nominal population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NominalStats {
    pub n_scored: u64,
    pub counts_by_code: BTreeMap<i64, u64>,
    pub proportions_by_code: BTreeMap<i64, f64>,
    pub num_distinct_categories: usize,
    /// Most frequent code; ties go to the smallest code (earliest first-seen)
    ///
    /// Serialized as a string, like the `*_by_code` map keys.
    #[serde(serialize_with = "code_as_string")]
    pub mode_code: Option<i64>,
    pub mode_label: Option<String>,
    pub labels_by_code: BTreeMap<i64, String>,
}

fn code_as_string<S: Serializer>(code: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match code {
        Some(code) => serializer.collect_str(code),
        None => serializer.serialize_none(),
    }
}

/// Code → count accumulator; codes come from a caller-owned [`CategoryCoder`]
#[derive(Debug, Clone, Default)]
pub struct NominalAccumulator {
    counts: BTreeMap<i64, u64>,
    n_scored: u64,
}

impl NominalAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_code(&mut self, code: i64) {
        *self.counts.entry(code).or_default() += 1;
        self.n_scored += 1;
    }

    /// Code a raw value and count it
    pub fn push_raw(&mut self, coder: &mut CategoryCoder, raw: &RawValue) -> Option<i64> {
        let code = coder.code_of(raw)?;
        self.push_code(code);
        Some(code)
    }

    pub fn n_scored(&self) -> u64 {
        self.n_scored
    }

    pub fn finish(self, coder: &CategoryCoder) -> NominalStats {
        let n_scored = self.n_scored;

        let mut mode: Option<(i64, u64)> = None;
        for (&code, &count) in &self.counts {
            if mode.map_or(true, |(_, best)| count > best) {
                mode = Some((code, count));
            }
        }
        let mode_code = mode.map(|(code, _)| code);

        let proportions_by_code = self
            .counts
            .iter()
            .map(|(&code, &count)| (code, proportion(count, n_scored)))
            .collect();
        let labels_by_code = self
            .counts
            .keys()
            .filter_map(|&code| coder.label_of(code).map(|l| (code, l.to_string())))
            .collect();

        NominalStats {
            n_scored,
            num_distinct_categories: self.counts.len(),
            mode_label: mode_code.and_then(|c| coder.label_of(c)).map(str::to_string),
            mode_code,
            proportions_by_code,
            labels_by_code,
            counts_by_code: self.counts,
        }
    }
}
