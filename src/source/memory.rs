//! Ordered in-memory score index, loadable from JSON-lines score records
//!
//! Each population (evaluation, score, scope) maps row keys to raw values in
//! a `BTreeMap`, which gives the ascending row-key traversal the engine
//! relies on for reproducible nominal coding.
//!
//! # JSON-lines record format
//!
//! ```text
//! {"evaluation_id":"ev1","score_id":"quality","experiment_id":"exp-a","row_key":17,"status":"DONE","value":"Good"}
//! {"evaluation_id":"ev1","score_id":"accuracy","row_key":17,"status":"DONE","value":0.93}
//! ```
//!
//! Records without `experiment_id` belong to the dataset scope. Only
//! `status == "DONE"` records with a non-null value are indexed.

use super::{RawValue, RowKey, Scope, ScoreSource, ScoredValue, ScoredValueStream};
use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lifecycle status of a stored score result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreStatus {
    Pending,
    Running,
    Done,
    Failed,
    #[serde(other)]
    Unknown,
}

/// One stored score result, as exported by the score store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub evaluation_id: String,
    pub score_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    pub row_key: RowKey,
    pub status: ScoreStatus,
    #[serde(default)]
    pub value: Option<RawValue>,
}

impl ScoreRecord {
    pub fn scope(&self) -> Scope {
        match &self.experiment_id {
            Some(id) => Scope::Experiment(id.clone()),
            None => Scope::Dataset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct PopulationKey {
    evaluation_id: String,
    score_id: String,
    scope: Scope,
}

impl PopulationKey {
    fn new(evaluation_id: &str, score_id: &str, scope: &Scope) -> Self {
        Self {
            evaluation_id: evaluation_id.to_string(),
            score_id: score_id.to_string(),
            scope: scope.clone(),
        }
    }
}

/// Score source backed by ordered in-memory maps
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    populations: BTreeMap<PopulationKey, BTreeMap<RowKey, RawValue>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one scored value, replacing any previous value for the row
    pub fn insert(
        &mut self,
        evaluation_id: &str,
        score_id: &str,
        scope: &Scope,
        row_key: RowKey,
        raw: impl Into<RawValue>,
    ) {
        self.populations
            .entry(PopulationKey::new(evaluation_id, score_id, scope))
            .or_default()
            .insert(row_key, raw.into());
    }

    /// Index a stored record; returns false if it is not a scored value
    pub fn insert_record(&mut self, record: ScoreRecord) -> bool {
        if record.status != ScoreStatus::Done {
            return false;
        }
        let scope = record.scope();
        let Some(value) = record.value else {
            return false;
        };
        self.insert(
            &record.evaluation_id,
            &record.score_id,
            &scope,
            record.row_key,
            value,
        );
        true
    }

    /// Total number of indexed scored values
    pub fn len(&self) -> usize {
        self.populations.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load records from a JSON-lines file
    pub fn from_jsonl_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        Self::from_jsonl_reader(BufReader::new(file))
    }

    /// Load records from any buffered JSON-lines reader
    ///
    /// Blank lines are ignored. A malformed line aborts the load with the
    /// offending (1-based) line number.
    pub fn from_jsonl_reader<R: BufRead>(reader: R) -> Result<Self, SourceError> {
        let mut source = Self::new();
        let mut skipped = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ScoreRecord =
                serde_json::from_str(&line).map_err(|e| SourceError::Parse {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            if !source.insert_record(record) {
                skipped += 1;
            }
        }

        tracing::debug!(
            indexed = source.len(),
            skipped,
            "Loaded score records from JSON lines"
        );
        Ok(source)
    }
}

impl ScoreSource for InMemorySource {
    fn score_ids(&self, evaluation_id: &str, scope: &Scope) -> Result<Vec<String>, SourceError> {
        let ids: BTreeSet<&str> = self
            .populations
            .iter()
            .filter(|(key, rows)| {
                key.evaluation_id == evaluation_id && &key.scope == scope && !rows.is_empty()
            })
            .map(|(key, _)| key.score_id.as_str())
            .collect();
        Ok(ids.into_iter().map(str::to_string).collect())
    }

    fn stream_scored_values<'a>(
        &'a self,
        evaluation_id: &str,
        score_id: &str,
        scope: &Scope,
    ) -> Result<ScoredValueStream<'a>, SourceError> {
        let key = PopulationKey::new(evaluation_id, score_id, scope);
        match self.populations.get(&key) {
            Some(rows) => Ok(Box::new(rows.iter().map(|(row_key, raw)| {
                Ok::<_, SourceError>(ScoredValue {
                    row_key: *row_key,
                    raw: raw.clone(),
                })
            }))),
            None => Ok(Box::new(std::iter::empty::<Result<ScoredValue, SourceError>>())),
        }
    }
}
