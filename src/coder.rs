//! Category coder: stable integer codes for nominal and ordinal labels
//!
//! - Ordinal: the code is the scale's declared rank, so codes (and CDFs keyed
//!   by them) are stable across calls.
//! - Nominal: codes are positional. A declared scale pre-assigns `1..=len`;
//!   any other label gets the next unused code when first observed.
//!
//! The coder is an explicit value owned by one aggregation pass. Feeding the
//! same labels in the same order always yields the same codes.

use crate::metadata::{ScaleEntry, ScoreMetadata, ScoringType};
use crate::source::RawValue;
use fnv::FnvHashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoderKind {
    /// Closed label set; unknown labels are rejected
    Ordinal,
    /// Open label set; unknown labels are appended
    Nominal,
}

/// Label → code mapping for one aggregation pass
#[derive(Debug, Clone)]
pub struct CategoryCoder {
    kind: CoderKind,
    codes: FnvHashMap<String, i64>,
    labels: BTreeMap<i64, String>,
    next_code: i64,
}

impl CategoryCoder {
    /// Coder for an ordinal scale: `code = entry.value`
    pub fn ordinal(scale: &[ScaleEntry]) -> Self {
        let mut coder = Self::empty(CoderKind::Ordinal);
        for entry in scale {
            coder.codes.insert(entry.label.clone(), entry.value);
            coder.labels.entry(entry.value).or_insert_with(|| entry.label.clone());
        }
        coder
    }

    /// Coder for a nominal score, optionally seeded with a declared scale
    pub fn nominal(scale: Option<&[ScaleEntry]>) -> Self {
        let mut coder = Self::empty(CoderKind::Nominal);
        for entry in scale.unwrap_or_default() {
            coder.assign(&entry.label);
        }
        coder
    }

    /// Coder matching a score's metadata
    ///
    /// Numeric scores have no categories; they get an empty nominal coder.
    pub fn for_metadata(metadata: &ScoreMetadata) -> Self {
        match metadata.scoring_type {
            ScoringType::Ordinal => Self::ordinal(metadata.scale.as_deref().unwrap_or_default()),
            _ => Self::nominal(metadata.scale.as_deref()),
        }
    }

    fn empty(kind: CoderKind) -> Self {
        Self {
            kind,
            codes: FnvHashMap::default(),
            labels: BTreeMap::new(),
            next_code: 1,
        }
    }

    fn assign(&mut self, label: &str) -> i64 {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.next_code;
        self.next_code += 1;
        self.codes.insert(label.to_string(), code);
        self.labels.insert(code, label.to_string());
        code
    }

    /// Code of a raw value, assigning a new nominal code if needed
    ///
    /// Returns `None` only for ordinal values that are not on the scale.
    /// Ordinal scores also accept a number equal to a declared rank.
    pub fn code_of(&mut self, raw: &RawValue) -> Option<i64> {
        match (self.kind, raw) {
            (CoderKind::Ordinal, RawValue::Number(n)) => self.rank_code(*n),
            (CoderKind::Ordinal, RawValue::Label(label)) => self.codes.get(label).copied().or_else(
                || label.trim().parse::<f64>().ok().and_then(|n| self.rank_code(n)),
            ),
            (CoderKind::Nominal, raw) => Some(self.assign(&raw.as_label())),
        }
    }

    /// Code of a plain label (see [`CategoryCoder::code_of`])
    pub fn code_of_label(&mut self, label: &str) -> Option<i64> {
        match self.kind {
            CoderKind::Ordinal => self.codes.get(label).copied(),
            CoderKind::Nominal => Some(self.assign(label)),
        }
    }

    fn rank_code(&self, n: f64) -> Option<i64> {
        if n.fract() != 0.0 {
            return None;
        }
        let code = n as i64;
        self.labels.contains_key(&code).then_some(code)
    }

    /// Label previously coded as `code`
    pub fn label_of(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    /// Every known code with its label, ascending by code
    pub fn labels(&self) -> &BTreeMap<i64, String> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
