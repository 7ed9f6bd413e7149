#![no_main]

use evalstat::aggregate::aggregate_population;
use evalstat::metadata::{OrdinalConfig, ScaleEntry, ScoreMetadata};
use evalstat::source::{InMemorySource, Scope, ScoreSource};
use evalstat::{CancellationToken, EngineConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading arbitrary JSON lines must fail cleanly, never panic
    let Ok(source) = InMemorySource::from_jsonl_reader(data) else {
        return;
    };

    let config = EngineConfig::default();
    let cancel = CancellationToken::new();
    let scores = [
        ScoreMetadata::numeric("s"),
        ScoreMetadata::nominal("s", None),
        ScoreMetadata::ordinal(
            "s",
            vec![ScaleEntry::new("lo", 1), ScaleEntry::new("hi", 2)],
            OrdinalConfig::default(),
        ),
    ];

    // Whatever was indexed must aggregate without panicking
    for evaluation in ["e", "ev1"] {
        let Ok(ids) = source.score_ids(evaluation, &Scope::Dataset) else {
            continue;
        };
        for score_id in ids {
            for metadata in &scores {
                if let Ok(values) =
                    source.stream_scored_values(evaluation, &score_id, &Scope::Dataset)
                {
                    let _ = aggregate_population(metadata, values, &config, &cancel);
                }
            }
        }
    }
});
