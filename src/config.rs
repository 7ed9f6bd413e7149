//! Engine configuration
//!
//! Loaded from an optional `evalstat.toml`; every field has a default so an
//! empty file (or no file) is a valid configuration.
//!
//! ```toml
//! z_critical = 1.96
//! significance_level = 0.05
//! continuity_correction = true
//! ordinal_percentiles = [10, 25, 50, 75, 90]
//! max_workers = 4
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the statistics and comparison engine
///
/// # Example
/// ```
/// use evalstat::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.z_critical, 1.96);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Critical value for the normal-approximation confidence intervals
    ///
    /// Used for `ci95_mean` and `ci95_delta`. Default: 1.96 (two-sided 95%).
    pub z_critical: f64,

    /// Alpha used for the `is_significant` flag on hypothesis test results
    ///
    /// Default: 0.05
    pub significance_level: f64,

    /// Apply the 0.5 continuity correction to the Wilcoxon normal approximation
    ///
    /// Default: true
    pub continuity_correction: bool,

    /// Percentiles (in percent) reported as ordinal percentile categories
    ///
    /// Default: `[10, 25, 50, 75, 90]`. 50 is always computed for the median.
    pub ordinal_percentiles: Vec<u8>,

    /// Upper bound on parallel per-score workers in a statistics request
    ///
    /// Default: number of available CPUs (at least 1)
    pub max_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            z_critical: 1.96,
            significance_level: 0.05,
            continuity_correction: true,
            ordinal_percentiles: vec![10, 25, 50, 75, 90],
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.z_critical.is_finite() && self.z_critical > 0.0) {
            return Err(format!(
                "z_critical must be a positive finite number, got {}",
                self.z_critical
            ));
        }

        if !(0.0..=1.0).contains(&self.significance_level) {
            return Err(format!(
                "significance_level must be in [0, 1], got {}",
                self.significance_level
            ));
        }

        if let Some(p) = self
            .ordinal_percentiles
            .iter()
            .find(|&&p| p == 0 || p > 100)
        {
            return Err(format!("ordinal_percentiles must be in [1, 100], got {}", p));
        }

        if self.max_workers == 0 {
            return Err("max_workers must be >= 1, got 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.z_critical, 1.96);
        assert_eq!(config.significance_level, 0.05);
        assert!(config.continuity_correction);
        assert_eq!(config.ordinal_percentiles, vec![10, 25, 50, 75, 90]);
        assert!(config.max_workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("z_critical = 2.576\nmax_workers = 2\n").unwrap();
        assert_eq!(config.z_critical, 2.576);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.significance_level, 0.05);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.z_critical, EngineConfig::default().z_critical);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(EngineConfig::from_toml_str("z_critical = \"wide\"").is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_significance_level() {
        let mut config = EngineConfig::default();
        config.significance_level = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_z_critical() {
        let mut config = EngineConfig::default();
        config.z_critical = -1.0;
        assert!(config.validate().is_err());
        config.z_critical = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_percentile() {
        let mut config = EngineConfig::default();
        config.ordinal_percentiles = vec![50, 101];
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_max_workers() {
        let mut config = EngineConfig::default();
        config.max_workers = 0;
        assert!(config.validate().is_err());
    }
}
