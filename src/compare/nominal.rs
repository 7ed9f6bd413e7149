//! Paired nominal comparison: distributions, Bowker's symmetry test, Cramér's V
//!
//! Both sides share one [`CategoryCoder`] (A coded before B on each row), so
//! a code means the same label on both sides of the contingency table.

use super::is_significant;
use crate::aggregate::NominalAccumulator;
use crate::coder::CategoryCoder;
use crate::config::EngineConfig;
use crate::metadata::ScoreMetadata;
use crate::source::PairedValue;
use crate::stats::{chi_square_sf, proportion};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Share of one category on each side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryComparison {
    pub label: String,
    pub proportion_a: f64,
    pub proportion_b: f64,
}

/// One non-empty cell of the paired contingency table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyCell {
    pub code_a: i64,
    pub code_b: i64,
    pub count: u64,
}

/// Bowker's test of symmetry (McNemar generalized to k categories)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowkerTest {
    pub statistic: f64,
    pub df: u64,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NominalComparison {
    pub n_paired: u64,
    pub distribution_comparison: BTreeMap<i64, CategoryComparison>,
    pub contingency_table: Vec<ContingencyCell>,
    /// Share of rows where both experiments gave the same label
    pub agreement_rate: f64,
    pub bowker: BowkerTest,
    pub cramers_v: Option<f64>,
}

/// Single-pass accumulator for [`NominalComparison`]
#[derive(Debug, Clone)]
pub struct NominalComparator {
    coder: CategoryCoder,
    a: NominalAccumulator,
    b: NominalAccumulator,
    table: BTreeMap<(i64, i64), u64>,
}

impl NominalComparator {
    pub fn new(metadata: &ScoreMetadata) -> Self {
        Self {
            coder: CategoryCoder::for_metadata(metadata),
            a: NominalAccumulator::new(),
            b: NominalAccumulator::new(),
            table: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, pair: &PairedValue) {
        let (Some(code_a), Some(code_b)) = (
            self.coder.code_of(&pair.raw_a),
            self.coder.code_of(&pair.raw_b),
        ) else {
            return;
        };
        self.a.push_code(code_a);
        self.b.push_code(code_b);
        *self.table.entry((code_a, code_b)).or_default() += 1;
    }

    pub fn finish(self, config: &EngineConfig) -> NominalComparison {
        let n = self.a.n_scored();
        let stats_a = self.a.finish(&self.coder);
        let stats_b = self.b.finish(&self.coder);

        let codes: BTreeSet<i64> = stats_a
            .counts_by_code
            .keys()
            .chain(stats_b.counts_by_code.keys())
            .copied()
            .collect();

        let distribution_comparison = codes
            .iter()
            .map(|&code| {
                let side = |props: &BTreeMap<i64, f64>| props.get(&code).copied().unwrap_or(0.0);
                (
                    code,
                    CategoryComparison {
                        label: self.coder.label_of(code).unwrap_or_default().to_string(),
                        proportion_a: side(&stats_a.proportions_by_code),
                        proportion_b: side(&stats_b.proportions_by_code),
                    },
                )
            })
            .collect();

        let agreed: u64 = self
            .table
            .iter()
            .filter(|((a, b), _)| a == b)
            .map(|(_, &count)| count)
            .sum();

        let bowker = bowker_test(&self.table, &codes, config);
        let cramers_v = cramers_v(
            &self.table,
            &stats_a.counts_by_code,
            &stats_b.counts_by_code,
            n,
        );

        NominalComparison {
            n_paired: n,
            distribution_comparison,
            contingency_table: self
                .table
                .iter()
                .map(|(&(code_a, code_b), &count)| ContingencyCell {
                    code_a,
                    code_b,
                    count,
                })
                .collect(),
            agreement_rate: proportion(agreed, n),
            bowker,
            cramers_v,
        }
    }
}

/// `χ² = Σ_{i<j} (n_ij − n_ji)² / (n_ij + n_ji)` over pairs with any mass,
/// against `k(k−1)/2` degrees of freedom
fn bowker_test(
    table: &BTreeMap<(i64, i64), u64>,
    codes: &BTreeSet<i64>,
    config: &EngineConfig,
) -> BowkerTest {
    let cell = |a: i64, b: i64| table.get(&(a, b)).copied().unwrap_or(0) as f64;
    let codes: Vec<i64> = codes.iter().copied().collect();

    let mut statistic = 0.0;
    for (i, &ci) in codes.iter().enumerate() {
        for &cj in &codes[i + 1..] {
            let (n_ij, n_ji) = (cell(ci, cj), cell(cj, ci));
            if n_ij + n_ji > 0.0 {
                statistic += (n_ij - n_ji).powi(2) / (n_ij + n_ji);
            }
        }
    }

    let k = codes.len() as u64;
    let df = k * k.saturating_sub(1) / 2;
    let p_value = if df > 0 {
        chi_square_sf(statistic, df as f64)
    } else {
        None
    };

    BowkerTest {
        statistic,
        df,
        p_value,
        is_significant: is_significant(p_value, config),
    }
}

/// `sqrt(χ² / (n * (min(r, c) − 1)))` with Pearson's independence χ²
fn cramers_v(
    table: &BTreeMap<(i64, i64), u64>,
    rows: &BTreeMap<i64, u64>,
    cols: &BTreeMap<i64, u64>,
    n: u64,
) -> Option<f64> {
    let min_dim = rows.len().min(cols.len());
    if n == 0 || min_dim < 2 {
        return None;
    }

    let n_f = n as f64;
    let mut chi_square = 0.0;
    for (&row, &row_total) in rows {
        for (&col, &col_total) in cols {
            let expected = row_total as f64 * col_total as f64 / n_f;
            let observed = table.get(&(row, col)).copied().unwrap_or(0) as f64;
            chi_square += (observed - expected).powi(2) / expected;
        }
    }

    Some((chi_square / (n_f * (min_dim - 1) as f64)).sqrt().min(1.0))
}
