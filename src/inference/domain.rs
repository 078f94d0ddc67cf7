//! Request and result types for single and batch predictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::error::{ServeError, ServeResult};
use crate::common::time;
use crate::model::Sentiment;

/// Largest batch a single request may carry.
pub const MAX_BATCH_SIZE: usize = 100;

/// Confidence reported by models that only produce labels.
pub const LABEL_ONLY_CONFIDENCE: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
}

impl PredictionRequest {
    pub fn validate(&self) -> ServeResult<()> {
        if self.text.is_empty() {
            return Err(ServeError::invalid("text must contain at least 1 character"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionRequest {
    pub texts: Vec<String>,
}

impl BatchPredictionRequest {
    pub fn validate(&self) -> ServeResult<()> {
        match self.texts.len() {
            0 => Err(ServeError::invalid("texts must contain at least 1 item")),
            n if n > MAX_BATCH_SIZE => Err(ServeError::invalid(format!(
                "texts must contain at most {MAX_BATCH_SIZE} items, got {n}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Outcome of one successful prediction. `text` is the caller's input verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
    #[serde(serialize_with = "time::serialize_iso")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResult {
    pub predictions: Vec<PredictionResult>,
    pub total_count: usize,
}

impl BatchPredictionResult {
    pub fn new(predictions: Vec<PredictionResult>) -> Self {
        let total_count = predictions.len();
        Self {
            predictions,
            total_count,
        }
    }
}

/// Per-item results of a batch, in input order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<ServeResult<PredictionResult>>,
}

impl BatchOutcome {
    /// Failed items with their input position.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ServeError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(idx, result)| result.as_ref().err().map(|err| (idx, err)))
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    /// Keep the successes, in order, and drop the failures.
    pub fn into_result(self) -> BatchPredictionResult {
        BatchPredictionResult::new(self.results.into_iter().filter_map(Result::ok).collect())
    }
}
