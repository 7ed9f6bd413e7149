//! Result assembly and rendering
//!
//! Shapes per-score aggregation results into the response contract.
//! Populations with zero scored rows are omitted; per-score failures are
//! carried alongside the successful entries.

use crate::aggregate::{NominalStats, NumericStats, OrdinalStats, PopulationStats};
use crate::compare::{ComparisonStats, NominalComparison, NumericComparison, OrdinalComparison};
use crate::error::EngineError;
use crate::source::Scope;
use serde::Serialize;
use std::fmt::Write as _;

/// Statistics of one score's population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationEntry {
    pub score_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    pub stats: PopulationStats,
}

/// A score whose statistics could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreFailure {
    pub score_id: String,
    pub message: String,
    pub retryable: bool,
}

/// Best-effort statistics for every score of an evaluation scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub evaluation_id: String,
    pub scope: String,
    pub entries: Vec<PopulationEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ScoreFailure>,
}

impl StatisticsReport {
    pub fn new(evaluation_id: impl Into<String>, scope: &Scope) -> Self {
        Self {
            evaluation_id: evaluation_id.into(),
            scope: scope.to_string(),
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add a computed population; empty populations are dropped
    ///
    /// Returns whether the entry was kept.
    pub fn push_stats(&mut self, score_id: &str, scope: &Scope, stats: PopulationStats) -> bool {
        if stats.n_scored() == 0 {
            tracing::debug!(score_id, "Omitting population with no scored rows");
            return false;
        }
        self.entries.push(PopulationEntry {
            score_id: score_id.to_string(),
            experiment_id: scope.experiment_id().map(str::to_string),
            stats,
        });
        true
    }

    pub fn push_failure(&mut self, score_id: &str, error: &EngineError) {
        self.errors.push(ScoreFailure {
            score_id: score_id.to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        });
    }

    /// Order entries and failures by score id so output is reproducible
    /// regardless of worker completion order
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.score_id.cmp(&b.score_id));
        self.errors.sort_by(|a, b| a.score_id.cmp(&b.score_id));
    }

    pub fn entry(&self, score_id: &str) -> Option<&PopulationEntry> {
        self.entries.iter().find(|e| e.score_id == score_id)
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(
            report,
            "Evaluation {} ({}): {} score(s)",
            self.evaluation_id,
            self.scope,
            self.entries.len()
        );

        for entry in &self.entries {
            let _ = writeln!(report, "\n== {} [{}] ==", entry.score_id, stats_kind(&entry.stats));
            match &entry.stats {
                PopulationStats::Numeric(s) => write_numeric(&mut report, s),
                PopulationStats::Nominal(s) => write_nominal(&mut report, s),
                PopulationStats::Ordinal(s) => write_ordinal(&mut report, s),
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(report, "\nFailed scores:");
            for failure in &self.errors {
                let _ = writeln!(report, "  {}: {}", failure.score_id, failure.message);
            }
        }
        report
    }
}

fn stats_kind(stats: &PopulationStats) -> &'static str {
    match stats {
        PopulationStats::Numeric(_) => "numeric",
        PopulationStats::Nominal(_) => "nominal",
        PopulationStats::Ordinal(_) => "ordinal",
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn write_numeric(report: &mut String, s: &NumericStats) {
    let _ = writeln!(report, "  n_scored: {}", s.n_scored);
    let _ = writeln!(report, "  mean:     {}", fmt_opt(s.mean));
    let _ = writeln!(report, "  std:      {}", fmt_opt(s.std));
    let _ = writeln!(
        report,
        "  min/max:  {} / {}",
        fmt_opt(s.min),
        fmt_opt(s.max)
    );
    let _ = writeln!(
        report,
        "  p10/p50/p90: {} / {} / {}",
        fmt_opt(s.p10),
        fmt_opt(s.p50),
        fmt_opt(s.p90)
    );
    if let Some(ci) = &s.ci95_mean {
        let _ = writeln!(report, "  95% CI:   [{:.4}, {:.4}]", ci.lower, ci.upper);
    }
    if s.excluded_rows > 0 {
        let _ = writeln!(report, "  excluded: {}", s.excluded_rows);
    }
}

fn write_nominal(report: &mut String, s: &NominalStats) {
    let _ = writeln!(report, "  n_scored: {}", s.n_scored);
    for (code, count) in &s.counts_by_code {
        let label = s.labels_by_code.get(code).map_or("?", String::as_str);
        let share = s.proportions_by_code.get(code).copied().unwrap_or(0.0);
        let _ = writeln!(
            report,
            "  {:>3} {:<20} {:>8} ({:.1}%)",
            code,
            label,
            count,
            share * 100.0
        );
    }
    if let Some(mode) = &s.mode_label {
        let _ = writeln!(report, "  mode:     {}", mode);
    }
}

fn write_ordinal(report: &mut String, s: &OrdinalStats) {
    let _ = writeln!(report, "  n_scored: {}", s.n_scored);
    for (code, count) in &s.counts_by_code {
        let label = s.labels_by_code.get(code).map_or("?", String::as_str);
        let cdf = s.cdf.get(code).copied().unwrap_or(0.0);
        let _ = writeln!(report, "  {:>3} {:<20} {:>8}  cdf {:.4}", code, label, count, cdf);
    }
    let _ = writeln!(report, "  pass rate: {:.4}", s.pass_rate.proportion);
    if let Some(median) = &s.median_category {
        let _ = writeln!(report, "  median:    {}", median);
    }
    if s.excluded_rows > 0 {
        let _ = writeln!(report, "  excluded:  {}", s.excluded_rows);
    }
}

/// Human-readable rendering of a paired comparison
pub fn comparison_report_string(stats: &ComparisonStats) -> String {
    let mut report = String::new();
    let _ = writeln!(
        report,
        "{}: {} (A) vs {} (B), {} paired row(s)",
        stats.score_id,
        stats.experiment_id_a,
        stats.experiment_id_b,
        stats.n_paired()
    );

    if let Some(c) = &stats.numeric {
        write_numeric_comparison(&mut report, c);
    }
    if let Some(c) = &stats.nominal {
        write_nominal_comparison(&mut report, c);
    }
    if let Some(c) = &stats.ordinal {
        write_ordinal_comparison(&mut report, c);
    }
    report
}

fn verdict(is_significant: bool) -> &'static str {
    if is_significant {
        "significant"
    } else {
        "not significant"
    }
}

fn write_numeric_comparison(report: &mut String, c: &NumericComparison) {
    let _ = writeln!(report, "  mean A: {}  mean B: {}", fmt_opt(c.mean_a), fmt_opt(c.mean_b));
    let _ = writeln!(report, "  delta:  {}", fmt_opt(c.delta_mean));
    if let Some(ci) = &c.ci95_delta {
        let _ = writeln!(report, "  95% CI: [{:.4}, {:.4}]", ci.lower, ci.upper);
    }
    let _ = writeln!(
        report,
        "  win/loss/tie: {:.3} / {:.3} / {:.3}",
        c.outcomes.win_rate, c.outcomes.loss_rate, c.outcomes.tie_rate
    );
    if let Some(t) = &c.paired_t_test {
        let _ = writeln!(
            report,
            "  paired t: t={:.4} df={} p={} ({})",
            t.statistic,
            t.df,
            fmt_opt(t.p_value),
            verdict(t.is_significant)
        );
    }
}

fn write_nominal_comparison(report: &mut String, c: &NominalComparison) {
    for (code, cat) in &c.distribution_comparison {
        let _ = writeln!(
            report,
            "  {:>3} {:<20} A {:.4}  B {:.4}",
            code, cat.label, cat.proportion_a, cat.proportion_b
        );
    }
    let _ = writeln!(report, "  agreement: {:.4}", c.agreement_rate);
    let _ = writeln!(
        report,
        "  Bowker: chi2={:.4} df={} p={} ({})",
        c.bowker.statistic,
        c.bowker.df,
        fmt_opt(c.bowker.p_value),
        verdict(c.bowker.is_significant)
    );
    let _ = writeln!(report, "  Cramer's V: {}", fmt_opt(c.cramers_v));
}

fn write_ordinal_comparison(report: &mut String, c: &OrdinalComparison) {
    let d = &c.delta_pass_rate;
    let _ = writeln!(
        report,
        "  pass rate A: {:.4}  B: {:.4}  delta: {:+.4}",
        d.pass_rate_a, d.pass_rate_b, d.delta
    );
    let _ = writeln!(
        report,
        "  win/loss/tie: {:.3} / {:.3} / {:.3}",
        c.outcomes.win_rate, c.outcomes.loss_rate, c.outcomes.tie_rate
    );
    let _ = writeln!(
        report,
        "  Wilcoxon: W={:.1} z={} p={} ({})",
        c.wilcoxon.statistic,
        fmt_opt(c.wilcoxon.z),
        fmt_opt(c.wilcoxon.p_value),
        verdict(c.wilcoxon.is_significant)
    );
    let _ = writeln!(
        report,
        "  Cliff's delta: {}  P(B>A): {}",
        fmt_opt(c.cliffs_delta),
        fmt_opt(c.probability_of_superiority)
    );
}
