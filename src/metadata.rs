//! Score metadata: scoring type, ordered scale, ordinal pass configuration
//!
//! The engine never owns score definitions. It asks a [`MetadataResolver`]
//! for them once per score and per request.

use crate::error::MetadataError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// How a score's values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringType {
    Numeric,
    Nominal,
    Ordinal,
    /// RAGAS metrics produce plain numbers and aggregate like `Numeric`
    Ragas,
}

impl ScoringType {
    /// Whether values of this type are category labels
    pub fn is_categorical(self) -> bool {
        matches!(self, ScoringType::Nominal | ScoringType::Ordinal)
    }
}

impl fmt::Display for ScoringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringType::Numeric => "NUMERIC",
            ScoringType::Nominal => "NOMINAL",
            ScoringType::Ordinal => "ORDINAL",
            ScoringType::Ragas => "RAGAS",
        };
        f.write_str(name)
    }
}

/// One category of a declared scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleEntry {
    pub label: String,
    /// Rank for ordinal scales; ignored (positional coding) for nominal
    pub value: i64,
}

impl ScaleEntry {
    pub fn new(label: impl Into<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Definition of a "pass" outcome for ordinal scores
///
/// A row passes when its label is in `acceptable_set`, or when its code is at
/// least `threshold_rank`. Either criterion alone is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptable_set: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_rank: Option<i64>,
}

/// Everything the engine needs to know about a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub score_id: String,
    pub scoring_type: ScoringType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<ScaleEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal_config: Option<OrdinalConfig>,
}

impl ScoreMetadata {
    pub fn numeric(score_id: impl Into<String>) -> Self {
        Self {
            score_id: score_id.into(),
            scoring_type: ScoringType::Numeric,
            scale: None,
            ordinal_config: None,
        }
    }

    pub fn nominal(score_id: impl Into<String>, scale: Option<Vec<ScaleEntry>>) -> Self {
        Self {
            score_id: score_id.into(),
            scoring_type: ScoringType::Nominal,
            scale,
            ordinal_config: None,
        }
    }

    pub fn ordinal(
        score_id: impl Into<String>,
        scale: Vec<ScaleEntry>,
        ordinal_config: OrdinalConfig,
    ) -> Self {
        Self {
            score_id: score_id.into(),
            scoring_type: ScoringType::Ordinal,
            scale: Some(scale),
            ordinal_config: Some(ordinal_config),
        }
    }

    /// Check the metadata is usable for aggregation
    ///
    /// Ordinal scores must declare a non-empty scale with unique ranks; scale
    /// labels must be unique. Nominal scales are optional.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.scoring_type == ScoringType::Ordinal
            && self.scale.as_ref().map_or(true, |s| s.is_empty())
        {
            return Err(MetadataError::ScaleMissing {
                score_id: self.score_id.clone(),
                scoring_type: self.scoring_type.to_string(),
            });
        }

        if let Some(scale) = &self.scale {
            let mut labels = HashSet::with_capacity(scale.len());
            let mut values = HashSet::with_capacity(scale.len());
            for entry in scale {
                if !labels.insert(entry.label.as_str()) {
                    return Err(MetadataError::DuplicateScaleLabel {
                        score_id: self.score_id.clone(),
                        label: entry.label.clone(),
                    });
                }
                if self.scoring_type == ScoringType::Ordinal && !values.insert(entry.value) {
                    return Err(MetadataError::DuplicateScaleValue {
                        score_id: self.score_id.clone(),
                        value: entry.value,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Source of score metadata (owned by the excluded CRUD layer)
pub trait MetadataResolver: Send + Sync {
    fn score_metadata(&self, score_id: &str) -> Result<ScoreMetadata, MetadataError>;
}

/// Map-backed resolver, loadable from a JSON array of [`ScoreMetadata`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadata {
    scores: HashMap<String, ScoreMetadata>,
    /// Entries that carried a `score_id` but failed to deserialize
    invalid: HashMap<String, String>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a score definition
    pub fn insert(&mut self, metadata: ScoreMetadata) {
        self.invalid.remove(&metadata.score_id);
        self.scores.insert(metadata.score_id.clone(), metadata);
    }

    pub fn with(mut self, metadata: ScoreMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Load definitions from a JSON file holding an array of score metadata
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse score metadata in {}", path.display()))
    }

    /// Parse a JSON array of definitions
    ///
    /// Only a malformed document fails the load. An entry that names its
    /// `score_id` but is otherwise unreadable (an unknown `scoring_type`, say)
    /// fails lookups of that score alone; an entry without a readable
    /// `score_id` is skipped with a warning.
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(content)?;
        let mut resolver = Self::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let score_id = entry
                .get("score_id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);

            match (serde_json::from_value::<ScoreMetadata>(entry), score_id) {
                (Ok(metadata), _) => resolver.insert(metadata),
                (Err(e), Some(score_id)) => {
                    tracing::warn!(%score_id, error = %e, "Unreadable score definition");
                    resolver.scores.remove(&score_id);
                    resolver.invalid.insert(score_id, e.to_string());
                }
                (Err(e), None) => {
                    tracing::warn!(index, error = %e, "Skipping score definition without score_id");
                }
            }
        }

        Ok(resolver)
    }
}

impl MetadataResolver for InMemoryMetadata {
    fn score_metadata(&self, score_id: &str) -> Result<ScoreMetadata, MetadataError> {
        if let Some(message) = self.invalid.get(score_id) {
            return Err(MetadataError::InvalidDefinition {
                score_id: score_id.to_string(),
                message: message.clone(),
            });
        }
        let metadata = self
            .scores
            .get(score_id)
            .cloned()
            .ok_or_else(|| MetadataError::ScoreNotFound(score_id.to_string()))?;
        metadata.validate()?;
        Ok(metadata)
    }
}
