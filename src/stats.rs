//! Numeric building blocks shared by the aggregators and comparators
//!
//! - [`Welford`]: single-pass mean/variance with bounded floating-point error
//! - [`percentile`]: linear-interpolated order statistic on sorted data
//! - tail probabilities for the normal, chi-square and Student's t
//!   distributions (via `statrs`)

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// Welford's online accumulator for mean and sample variance
///
/// Accumulation order matters for bit-identical results, so every caller
/// feeds values in stream (ascending row-key) order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one observation in O(1)
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (denominator `n - 1`), `None` when `n < 2`
    pub fn sample_variance(&self) -> Option<f64> {
        // m2 can drift a hair below zero for constant input
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).max(0.0))
    }

    /// Sample standard deviation, `None` when `n < 2`
    pub fn sample_std(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Normal-approximation confidence interval of the mean
    ///
    /// `mean ± z * std / sqrt(n)`; `None` when the variance is undefined.
    pub fn confidence_interval(&self, z: f64) -> Option<(f64, f64)> {
        let mean = self.mean()?;
        let std = self.sample_std()?;
        let half_width = z * std / (self.count as f64).sqrt();
        Some((mean - half_width, mean + half_width))
    }
}

/// Linear-interpolated percentile of ascending-sorted data
///
/// `p` is a fraction in `[0, 1]`. The rank is `p * (n - 1)`; the result
/// interpolates between the two order statistics bracketing that rank.
/// Returns `None` for empty input.
pub fn percentile(sorted_data: &[f64], p: f64) -> Option<f64> {
    match sorted_data.len() {
        0 => None,
        1 => Some(sorted_data[0]),
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;

            if lower == upper {
                Some(sorted_data[lower])
            } else {
                let weight = rank - lower as f64;
                Some(sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight)
            }
        }
    }
}

/// Two-sided p-value of a standard normal deviate
pub fn normal_two_sided_p(z: f64) -> Option<f64> {
    if !z.is_finite() {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some((2.0 * normal.sf(z.abs())).min(1.0))
}

/// Upper-tail probability of a chi-square statistic
pub fn chi_square_sf(statistic: f64, df: f64) -> Option<f64> {
    if !(statistic.is_finite() && df > 0.0) {
        return None;
    }
    let dist = ChiSquared::new(df).ok()?;
    Some(dist.sf(statistic.max(0.0)))
}

/// Two-sided p-value of a Student's t statistic
pub fn students_t_two_sided_p(t: f64, df: f64) -> Option<f64> {
    if !(t.is_finite() && df > 0.0) {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Share of `part` in `whole`, 0 for an empty whole
pub fn proportion(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
