//! Domain types for model artifacts and the capabilities they expose.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::common::error::{ArtifactLoadError, ServeError, ServeResult};

/// Version label of the loaded model/vectorizer pair.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelVersion(String);

impl ModelVersion {
    pub const UNKNOWN: &'static str = "unknown";
    pub const LOCAL: &'static str = "local_v1.0";
    pub const REGISTRY: &'static str = "mlflow_latest";

    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Version reported before anything is loaded.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Predicted sentiment. Serialized as the integers `-1`, `0`, `1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn as_i8(self) -> i8 {
        match self {
            Sentiment::Negative => -1,
            Sentiment::Neutral => 0,
            Sentiment::Positive => 1,
        }
    }
}

impl TryFrom<i64> for Sentiment {
    type Error = ServeError;

    fn try_from(label: i64) -> ServeResult<Self> {
        match label {
            -1 => Ok(Sentiment::Negative),
            0 => Ok(Sentiment::Neutral),
            1 => Ok(Sentiment::Positive),
            other => Err(ServeError::inference(format!(
                "model produced label {other}, expected -1, 0 or 1"
            ))),
        }
    }
}

impl Serialize for Sentiment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Sentiment::try_from(raw).map_err(|_| de::Error::custom(format!("invalid sentiment {raw}")))
    }
}

/// Sparse single-row feature vector. Entries are sorted by column and unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseRow {
    width: usize,
    entries: Vec<(usize, f32)>,
}

impl SparseRow {
    /// Build a row, sorting entries and merging duplicate columns.
    pub fn new(width: usize, mut entries: Vec<(usize, f32)>) -> ServeResult<Self> {
        if let Some((col, _)) = entries.iter().find(|(col, _)| *col >= width) {
            return Err(ServeError::inference(format!(
                "feature column {col} outside row width {width}"
            )));
        }
        entries.sort_by_key(|(col, _)| *col);
        let mut merged: Vec<(usize, f32)> = Vec::with_capacity(entries.len());
        for (col, value) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == col => *acc += value,
                _ => merged.push((col, value)),
            }
        }
        Ok(Self {
            width,
            entries: merged,
        })
    }

    pub fn zeros(width: usize) -> Self {
        Self {
            width,
            entries: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    /// Dot product with a dense weight vector of the same width.
    pub fn dot(&self, dense: &[f32]) -> f32 {
        self.entries
            .iter()
            .filter_map(|(col, value)| dense.get(*col).map(|w| w * value))
            .sum()
    }
}

/// Whether a model can report per-class probabilities. Decided once at load.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfidenceCapability {
    SupportsConfidence,
    LabelOnly,
}

/// Maps normalised text to the feature row the model expects.
pub trait Vectorizer: Send + Sync {
    /// Number of feature columns produced.
    fn width(&self) -> usize;

    fn transform(&self, text: &str) -> ServeResult<SparseRow>;

    /// Term to column mapping, when the vectorizer has one.
    fn vocabulary(&self) -> Option<&BTreeMap<String, usize>> {
        None
    }
}

/// Discrete sentiment classifier over a single feature row.
pub trait Classifier: Send + Sync {
    /// Human readable model family, reported by `/model/info`.
    fn model_type(&self) -> &str;

    fn capability(&self) -> ConfidenceCapability;

    /// Feature width the model was trained on, if it declares one.
    fn n_features(&self) -> Option<usize> {
        None
    }

    fn predict(&self, row: &SparseRow) -> ServeResult<i64>;

    /// Per-class probabilities. Only called when `capability()` allows it.
    fn predict_proba(&self, _row: &SparseRow) -> ServeResult<Vec<f32>> {
        Err(ServeError::inference(format!(
            "{} does not expose class probabilities",
            self.model_type()
        )))
    }

    fn has_feature_importances(&self) -> bool {
        false
    }
}

/// A matched vectorizer/model pair as produced by an artifact store.
pub struct ArtifactPair {
    pub vectorizer: Box<dyn Vectorizer>,
    pub model: Box<dyn Classifier>,
    pub version: ModelVersion,
}

impl fmt::Debug for ArtifactPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactPair")
            .field("model_type", &self.model.model_type())
            .field("width", &self.vectorizer.width())
            .field("version", &self.version)
            .finish()
    }
}

/// Source of the artifact pair loaded at startup.
pub trait ArtifactStore {
    /// Where the artifacts come from, for logs.
    fn describe(&self) -> String;

    fn load(&self) -> Result<ArtifactPair, ArtifactLoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_accepts_only_three_labels() {
        assert_eq!(Sentiment::try_from(-1).unwrap(), Sentiment::Negative);
        assert_eq!(Sentiment::try_from(0).unwrap(), Sentiment::Neutral);
        assert_eq!(Sentiment::try_from(1).unwrap(), Sentiment::Positive);
        assert!(matches!(Sentiment::try_from(2), Err(ServeError::Inference(_))));
    }

    #[test]
    fn sentiment_serializes_as_integer() {
        let json = serde_json::to_string(&[Sentiment::Negative, Sentiment::Positive]).unwrap();
        assert_eq!(json, "[-1,1]");
        let back: Sentiment = serde_json::from_str("0").unwrap();
        assert_eq!(back, Sentiment::Neutral);
        assert!(serde_json::from_str::<Sentiment>("7").is_err());
    }

    #[test]
    fn sparse_row_sorts_and_merges() {
        let row = SparseRow::new(4, vec![(3, 1.0), (1, 2.0), (3, 0.5)]).unwrap();
        assert_eq!(row.entries(), &[(1, 2.0), (3, 1.5)]);
        assert_eq!(row.dot(&[1.0, 1.0, 1.0, 2.0]), 5.0);
    }

    #[test]
    fn sparse_row_rejects_out_of_range_column() {
        assert!(SparseRow::new(2, vec![(2, 1.0)]).is_err());
        assert!(SparseRow::zeros(2).entries().is_empty());
    }
}
