//! End-to-end scenarios through the engine
//!
//! Each test loads a population into the in-memory source and checks the
//! reported statistics against hand-computed values.

mod utils;

use evalstat::source::{InMemorySource, RowKey, Scope};
use std::time::{Duration, Instant};
use utils::{engine, insert_population, repeated, EVAL};

#[test]
fn test_numeric_population_statistics() {
    let mut source = InMemorySource::new();
    let values = repeated(&[(1.0, 50), (2.0, 50), (3.0, 50)]);
    insert_population(&mut source, "accuracy", &Scope::Dataset, &values);

    let report = engine(source)
        .compute_statistics(EVAL, &Scope::Dataset)
        .unwrap();
    let stats = report.entry("accuracy").unwrap().stats.as_numeric().unwrap();

    assert_eq!(stats.n_scored, 150);
    assert!((stats.mean.unwrap() - 2.0).abs() < 1e-12);
    assert!((stats.variance.unwrap() - 100.0 / 149.0).abs() < 1e-12);
    assert_eq!(stats.p10, Some(1.0));
    assert_eq!(stats.p50, Some(2.0));
    assert_eq!(stats.p90, Some(3.0));

    let ci = stats.ci95_mean.unwrap();
    assert!(((ci.lower + ci.upper) / 2.0 - 2.0).abs() < 1e-12);
}

#[test]
fn test_nominal_population_statistics() {
    let mut source = InMemorySource::new();
    let values = repeated(&[("A", 60), ("B", 50), ("C", 40)]);
    insert_population(&mut source, "topic", &Scope::Dataset, &values);

    let report = engine(source)
        .compute_statistics(EVAL, &Scope::Dataset)
        .unwrap();
    let stats = report.entry("topic").unwrap().stats.as_nominal().unwrap();

    assert_eq!(stats.counts_by_code[&1], 60);
    assert_eq!(stats.counts_by_code[&2], 50);
    assert_eq!(stats.counts_by_code[&3], 40);
    assert!((stats.proportions_by_code[&1] - 0.4).abs() < 1e-12);
    assert_eq!(stats.num_distinct_categories, 3);
    assert_eq!(stats.mode_code, Some(1));
    assert_eq!(stats.mode_label.as_deref(), Some("A"));
}

#[test]
fn test_ordinal_population_statistics() {
    let mut source = InMemorySource::new();
    let values = repeated(&[("Bad", 30), ("Ok", 30), ("Good", 45), ("Great", 45)]);
    insert_population(&mut source, "quality", &Scope::Dataset, &values);

    let report = engine(source)
        .compute_statistics(EVAL, &Scope::Dataset)
        .unwrap();
    let stats = report.entry("quality").unwrap().stats.as_ordinal().unwrap();

    assert!((stats.cdf[&1] - 0.2).abs() < 1e-12);
    assert!((stats.cdf[&2] - 0.4).abs() < 1e-12);
    assert!((stats.cdf[&3] - 0.7).abs() < 1e-12);
    assert_eq!(stats.cdf[&4], 1.0);
    assert!((stats.pass_rate.proportion - 0.6).abs() < 1e-12);
    assert_eq!(stats.median_category.as_deref(), Some("Good"));
}

#[test]
fn test_paired_numeric_uniform_improvement() {
    let mut source = InMemorySource::new();
    let a = repeated(&[(0.0, 75), (2.0, 75)]);
    let b: Vec<f64> = a.iter().map(|x| x + 0.1).collect();
    insert_population(&mut source, "accuracy", &Scope::experiment("a"), &a);
    insert_population(&mut source, "accuracy", &Scope::experiment("b"), &b);

    let stats = engine(source)
        .compute_comparison(EVAL, "a", "b", "accuracy")
        .unwrap();
    let numeric = stats.numeric.unwrap();

    assert_eq!(numeric.n_paired, 150);
    assert!((numeric.delta_mean.unwrap() - 0.1).abs() < 1e-9);
    assert_eq!(numeric.outcomes.win_rate, 1.0);
    assert_eq!(numeric.outcomes.loss_rate, 0.0);
    assert_eq!(numeric.outcomes.tie_rate, 0.0);
}

#[test]
fn test_paired_numeric_scale() {
    const ROWS: u64 = 100_000;
    let mut source = InMemorySource::new();
    let a = Scope::experiment("a");
    let b = Scope::experiment("b");
    for row in 0..ROWS {
        let x = (row % 1000) as f64 / 1000.0;
        source.insert(EVAL, "accuracy", &a, RowKey(row), x);
        source.insert(EVAL, "accuracy", &b, RowKey(row), x + 0.01);
    }
    let engine = engine(source);

    let start = Instant::now();
    let stats = engine.compute_comparison(EVAL, "a", "b", "accuracy").unwrap();
    let elapsed = start.elapsed();

    let numeric = stats.numeric.unwrap();
    assert_eq!(numeric.n_paired, ROWS);
    assert!((numeric.delta_mean.unwrap() - 0.01).abs() < 1e-9);
    assert!(elapsed < Duration::from_secs(60), "comparison took {:?}", elapsed);
}

#[test]
fn test_unscored_rows_excluded_from_join() {
    let mut source = InMemorySource::new();
    let a = Scope::experiment("a");
    let b = Scope::experiment("b");
    // Row 2 only has A, row 3 only has B
    source.insert(EVAL, "accuracy", &a, RowKey(1), 0.5);
    source.insert(EVAL, "accuracy", &a, RowKey(2), 0.5);
    source.insert(EVAL, "accuracy", &b, RowKey(1), 0.7);
    source.insert(EVAL, "accuracy", &b, RowKey(3), 0.1);

    let stats = engine(source)
        .compute_comparison(EVAL, "a", "b", "accuracy")
        .unwrap();
    assert_eq!(stats.n_paired(), 1);
    assert_eq!(stats.numeric.unwrap().outcomes.wins, 1);
}

#[test]
fn test_ordinal_comparison_end_to_end() {
    let mut source = InMemorySource::new();
    let a = repeated(&[("Bad", 20), ("Ok", 20), ("Good", 10)]);
    let b = repeated(&[("Ok", 20), ("Good", 20), ("Great", 10)]);
    insert_population(&mut source, "quality", &Scope::experiment("a"), &a);
    insert_population(&mut source, "quality", &Scope::experiment("b"), &b);

    let stats = engine(source)
        .compute_comparison(EVAL, "a", "b", "quality")
        .unwrap();
    let ordinal = stats.ordinal.unwrap();

    assert_eq!(ordinal.n_paired, 50);
    assert!((ordinal.delta_pass_rate.pass_rate_a - 0.2).abs() < 1e-12);
    assert!((ordinal.delta_pass_rate.pass_rate_b - 0.6).abs() < 1e-12);
    assert_eq!(ordinal.outcomes.win_rate, 1.0);
    assert_eq!(ordinal.cliffs_delta, Some(1.0));
    assert!(ordinal.wilcoxon.is_significant);
}

#[test]
fn test_nominal_comparison_end_to_end() {
    let mut source = InMemorySource::new();
    let a = repeated(&[("billing", 30), ("shipping", 30)]);
    let b = repeated(&[("billing", 10), ("shipping", 50)]);
    insert_population(&mut source, "topic", &Scope::experiment("a"), &a);
    insert_population(&mut source, "topic", &Scope::experiment("b"), &b);

    let stats = engine(source)
        .compute_comparison(EVAL, "a", "b", "topic")
        .unwrap();
    let nominal = stats.nominal.unwrap();

    // 20 rows moved billing -> shipping, none moved back
    assert_eq!(nominal.n_paired, 60);
    assert!((nominal.bowker.statistic - 20.0).abs() < 1e-12);
    assert!(nominal.bowker.is_significant);
    assert!((nominal.agreement_rate - 40.0 / 60.0).abs() < 1e-12);
    let billing = &nominal.distribution_comparison[&1];
    assert_eq!(billing.label, "billing");
    assert!((billing.proportion_a - 0.5).abs() < 1e-12);
}
