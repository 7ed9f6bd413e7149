// Shared fixtures for integration tests
//
// Score metadata for the canonical numeric/nominal/ordinal scores and
// builders that load populations into an in-memory source.
#![allow(dead_code)]

use evalstat::metadata::{InMemoryMetadata, OrdinalConfig, ScaleEntry, ScoreMetadata};
use evalstat::source::{InMemorySource, RawValue, RowKey, Scope};
use evalstat::{Engine, EngineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const EVAL: &str = "eval-1";

/// Bad=1 < Ok=2 < Good=3 < Great=4, passing at Good or Great
pub fn quality_metadata() -> ScoreMetadata {
    ScoreMetadata::ordinal(
        "quality",
        vec![
            ScaleEntry::new("Bad", 1),
            ScaleEntry::new("Ok", 2),
            ScaleEntry::new("Good", 3),
            ScaleEntry::new("Great", 4),
        ],
        OrdinalConfig {
            acceptable_set: Some(vec!["Good".to_string(), "Great".to_string()]),
            threshold_rank: None,
        },
    )
}

pub fn all_metadata() -> InMemoryMetadata {
    InMemoryMetadata::new()
        .with(ScoreMetadata::numeric("accuracy"))
        .with(ScoreMetadata::nominal("topic", None))
        .with(quality_metadata())
}

pub fn engine(source: InMemorySource) -> Engine<InMemoryMetadata, InMemorySource> {
    Engine::new(all_metadata(), source, EngineConfig::default()).expect("default config is valid")
}

/// Insert `values` for consecutive row keys starting at 1
pub fn insert_population<V: Into<RawValue> + Clone>(
    source: &mut InMemorySource,
    score_id: &str,
    scope: &Scope,
    values: &[V],
) {
    for (i, value) in values.iter().enumerate() {
        source.insert(EVAL, score_id, scope, RowKey(i as u64 + 1), value.clone());
    }
}

/// `count` copies of each `(value, count)` entry, in order
pub fn repeated<V: Clone>(blocks: &[(V, usize)]) -> Vec<V> {
    blocks
        .iter()
        .flat_map(|(value, count)| std::iter::repeat(value.clone()).take(*count))
        .collect()
}

/// Two experiments scored on overlapping rows with seeded random values
///
/// Each experiment skips roughly one row in ten so the paired join has
/// something to drop.
pub fn random_experiments(seed: u64, rows: u64) -> InMemorySource {
    let mut rng = StdRng::seed_from_u64(seed);
    let labels = ["Bad", "Ok", "Good", "Great"];
    let topics = ["billing", "shipping", "returns"];
    let a = Scope::experiment("a");
    let b = Scope::experiment("b");
    let mut source = InMemorySource::new();

    for row in 1..=rows {
        let key = RowKey(row);
        for scope in [&a, &b] {
            if rng.gen_bool(0.1) {
                continue;
            }
            source.insert(EVAL, "accuracy", scope, key, rng.gen_range(0.0..1.0));
            source.insert(EVAL, "topic", scope, key, topics[rng.gen_range(0..topics.len())]);
            source.insert(EVAL, "quality", scope, key, labels[rng.gen_range(0..labels.len())]);
        }
    }
    source
}
