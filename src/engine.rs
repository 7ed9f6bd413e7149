//! Orchestration: resolver → source → aggregator → assembler
//!
//! Statistics requests fan out one worker per score, bounded by
//! `max_workers`. Score ids are queued on a lock-free `ArrayQueue`; workers
//! drain it and send results back over a channel. Each worker owns its
//! stream and accumulator, so nothing mutable is shared between scores.
//!
//! Statistics are best-effort per score. Comparisons are atomic.

use crate::aggregate::{aggregate_population, PopulationStats};
use crate::cancel::CancellationToken;
use crate::compare::{compare_paired, ComparisonStats};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::metadata::MetadataResolver;
use crate::report::StatisticsReport;
use crate::source::{Scope, ScoreSource};
use crossbeam::channel;
use crossbeam::queue::ArrayQueue;
use std::time::Instant;

/// Statistics engine over a metadata resolver and a score source
pub struct Engine<M, S> {
    metadata: M,
    source: S,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl<M: MetadataResolver, S: ScoreSource> Engine<M, S> {
    /// Create an engine, rejecting invalid configuration up front
    pub fn new(metadata: M, source: S, config: EngineConfig) -> Result<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self {
            metadata,
            source,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every computation running on this engine
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Statistics for a single score's population
    pub fn population_stats(
        &self,
        evaluation_id: &str,
        score_id: &str,
        scope: &Scope,
    ) -> Result<PopulationStats> {
        let metadata = self.metadata.score_metadata(score_id)?;
        let values = self
            .source
            .stream_scored_values(evaluation_id, score_id, scope)?;
        aggregate_population(&metadata, values, &self.config, &self.cancel)
    }

    /// Statistics for every score in the scope
    ///
    /// A score that fails (unknown metadata, stream error) is listed in
    /// `errors` and does not affect the others. Failing to enumerate scores
    /// or cancellation fails the whole request.
    pub fn compute_statistics(
        &self,
        evaluation_id: &str,
        scope: &Scope,
    ) -> Result<StatisticsReport> {
        let start = Instant::now();
        let score_ids = self.source.score_ids(evaluation_id, scope)?;
        let mut report = StatisticsReport::new(evaluation_id, scope);
        if score_ids.is_empty() {
            return Ok(report);
        }

        let workers = self.config.max_workers.clamp(1, score_ids.len());
        let queue = ArrayQueue::new(score_ids.len());
        for score_id in score_ids {
            // Capacity equals the id count, so this cannot overflow
            let _ = queue.push(score_id);
        }
        let (tx, rx) = channel::unbounded();

        crossbeam::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move |_| {
                    while let Some(score_id) = queue.pop() {
                        let result = self.population_stats(evaluation_id, &score_id, scope);
                        if tx.send((score_id, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        })
        .map_err(|panic| EngineError::WorkerPanicked(panic_message(panic.as_ref())))?;
        drop(tx);

        for (score_id, result) in rx {
            match result {
                Ok(stats) => {
                    report.push_stats(&score_id, scope, stats);
                }
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    tracing::warn!(%score_id, error = %err, "Score statistics failed");
                    report.push_failure(&score_id, &err);
                }
            }
        }
        report.sort();

        tracing::debug!(
            evaluation_id,
            %scope,
            scores = report.entries.len(),
            failures = report.errors.len(),
            workers,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Computed statistics"
        );
        Ok(report)
    }

    /// Paired comparison of two experiments on one score
    ///
    /// Either a complete result or an error; never a partial comparison.
    pub fn compute_comparison(
        &self,
        evaluation_id: &str,
        experiment_a: &str,
        experiment_b: &str,
        score_id: &str,
    ) -> Result<ComparisonStats> {
        let start = Instant::now();
        let metadata = self.metadata.score_metadata(score_id)?;
        let pairs = self.source.stream_paired_scored_values(
            evaluation_id,
            score_id,
            experiment_a,
            experiment_b,
        )?;
        let stats = compare_paired(
            &metadata,
            experiment_a,
            experiment_b,
            pairs,
            &self.config,
            &self.cancel,
        )?;

        tracing::debug!(
            evaluation_id,
            score_id,
            n_paired = stats.n_paired(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Computed comparison"
        );
        Ok(stats)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
