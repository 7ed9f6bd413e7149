//! Numeric (and RAGAS) population statistics
//!
//! Moments come from a Welford accumulator; percentiles need the exact order
//! statistics, so the accumulator also keeps a flat `Vec<f64>` of values.

use super::ConfidenceInterval;
use crate::config::EngineConfig;
use crate::source::{RawValue, RowKey};
use crate::stats::{percentile, Welford};
use serde::Serialize;

/// Descriptive statistics of a numeric population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub n_scored: u64,
    pub mean: Option<f64>,
    /// Sample variance (denominator `n - 1`)
    pub variance: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub ci95_mean: Option<ConfidenceInterval>,
    /// Rows whose value could not be read as a number
    pub excluded_rows: u64,
}

/// Single-pass accumulator for [`NumericStats`]
#[derive(Debug, Clone, Default)]
pub struct NumericAccumulator {
    moments: Welford,
    values: Vec<f64>,
    excluded_rows: u64,
}

impl NumericAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.moments.push(x);
        self.values.push(x);
    }

    /// Accumulate a raw value, excluding (and logging) non-numeric ones
    pub fn push_raw(&mut self, row_key: RowKey, raw: &RawValue) -> Option<f64> {
        match raw.as_number() {
            Some(x) => {
                self.push(x);
                Some(x)
            }
            None => {
                self.exclude(row_key, raw);
                None
            }
        }
    }

    /// Record a row dropped for a data-integrity anomaly
    pub fn exclude(&mut self, row_key: RowKey, raw: &RawValue) {
        tracing::warn!(%row_key, ?raw, "Excluding non-numeric value from numeric score");
        self.excluded_rows += 1;
    }

    pub fn n_scored(&self) -> u64 {
        self.moments.count()
    }

    pub fn finish(self, config: &EngineConfig) -> NumericStats {
        let Self {
            moments,
            mut values,
            excluded_rows,
        } = self;
        values.sort_by(f64::total_cmp);

        let variance = moments.sample_variance();
        NumericStats {
            n_scored: moments.count(),
            mean: moments.mean(),
            variance,
            std: variance.map(f64::sqrt),
            min: values.first().copied(),
            max: values.last().copied(),
            p10: percentile(&values, 0.10),
            p25: percentile(&values, 0.25),
            p50: percentile(&values, 0.50),
            p75: percentile(&values, 0.75),
            p90: percentile(&values, 0.90),
            ci95_mean: moments
                .confidence_interval(config.z_critical)
                .map(ConfidenceInterval::from),
            excluded_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_of(values: &[f64]) -> NumericStats {
        let mut acc = NumericAccumulator::new();
        values.iter().for_each(|&v| acc.push(v));
        acc.finish(&EngineConfig::default())
    }

    #[test]
    fn test_three_level_population() {
        let values: Vec<f64> = [1.0, 2.0, 3.0]
            .iter()
            .flat_map(|&v| std::iter::repeat(v).take(50))
            .collect();
        let stats = stats_of(&values);

        assert_eq!(stats.n_scored, 150);
        assert!((stats.mean.unwrap() - 2.0).abs() < 1e-12);
        assert!((stats.variance.unwrap() - 100.0 / 149.0).abs() < 1e-12);
        assert_eq!(stats.p10, Some(1.0));
        assert_eq!(stats.p50, Some(2.0));
        assert_eq!(stats.p90, Some(3.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(3.0));
    }

    #[test]
    fn test_ci_symmetric_around_mean() {
        let stats = stats_of(&[0.2, 0.4, 0.9, 0.1, 0.7]);
        let ci = stats.ci95_mean.unwrap();
        let mean = stats.mean.unwrap();
        assert!(((mean - ci.lower) - (ci.upper - mean)).abs() < 1e-12);
        let expected_half = 1.96 * stats.std.unwrap() / 5f64.sqrt();
        assert!((ci.upper - mean - expected_half).abs() < 1e-12);
    }

    #[test]
    fn test_empty_population() {
        let stats = stats_of(&[]);
        assert_eq!(stats.n_scored, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.variance, None);
        assert_eq!(stats.p50, None);
        assert_eq!(stats.ci95_mean, None);
    }

    #[test]
    fn test_single_value_population() {
        let stats = stats_of(&[4.0]);
        assert_eq!(stats.mean, Some(4.0));
        assert_eq!(stats.variance, None);
        assert_eq!(stats.std, None);
        assert_eq!(stats.p10, Some(4.0));
    }

    #[test]
    fn test_non_numeric_rows_excluded() {
        let mut acc = NumericAccumulator::new();
        acc.push_raw(RowKey(1), &RawValue::Number(1.0));
        acc.push_raw(RowKey(2), &RawValue::from("n/a"));
        acc.push_raw(RowKey(3), &RawValue::from("3"));
        let stats = acc.finish(&EngineConfig::default());
        assert_eq!(stats.n_scored, 2);
        assert_eq!(stats.excluded_rows, 1);
        assert_eq!(stats.mean, Some(2.0));
    }
}
