//! Linear sentiment classifiers loaded from JSON artifacts.
//!
//! Binary models carry a single coefficient row and predict `classes[1]` when
//! the decision value is positive. Multiclass models carry one row per class
//! and predict the argmax.

use serde::{Deserialize, Serialize};

use crate::common::error::{ServeError, ServeResult};

use super::domain::{Classifier, ConfidenceCapability, SparseRow};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearKind {
    LogisticRegression,
    LinearSvc,
}

impl LinearKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinearKind::LogisticRegression => "LogisticRegression",
            LinearKind::LinearSvc => "LinearSVC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    model_type: LinearKind,
    classes: Vec<i64>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    #[serde(default)]
    feature_importances: Option<Vec<f32>>,
}

impl LinearClassifier {
    pub fn new(
        model_type: LinearKind,
        classes: Vec<i64>,
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
    ) -> Self {
        Self {
            model_type,
            classes,
            coef,
            intercept,
            feature_importances: None,
        }
    }

    pub fn with_feature_importances(mut self, importances: Vec<f32>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    /// Check shapes and labels after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("need at least two classes, got {}", self.classes.len()));
        }
        if let Some(bad) = self.classes.iter().find(|c| !(-1..=1).contains(*c)) {
            return Err(format!("class label {bad} is not a sentiment (-1, 0, 1)"));
        }
        let mut seen = self.classes.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.classes.len() {
            return Err("class labels must be unique".to_string());
        }

        let expected_rows = if self.classes.len() == 2 { 1 } else { self.classes.len() };
        if self.coef.len() != expected_rows {
            return Err(format!(
                "{} classes need {expected_rows} coefficient rows, got {}",
                self.classes.len(),
                self.coef.len()
            ));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "intercept has {} entries for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            ));
        }

        let width = self.coef[0].len();
        if self.coef.iter().any(|row| row.len() != width) {
            return Err("coefficient rows differ in width".to_string());
        }
        if let Some(imp) = &self.feature_importances {
            if imp.len() != width {
                return Err(format!(
                    "feature_importances has {} entries for {width} features",
                    imp.len()
                ));
            }
        }

        let finite = self
            .coef
            .iter()
            .flatten()
            .chain(self.intercept.iter())
            .all(|w| w.is_finite());
        if !finite {
            return Err("coefficients contain non-finite weights".to_string());
        }
        Ok(())
    }

    fn check_width(&self, row: &SparseRow) -> ServeResult<()> {
        let width = self.coef.first().map(Vec::len).unwrap_or(0);
        if row.width() != width {
            return Err(ServeError::inference(format!(
                "feature row has width {}, model expects {width}",
                row.width()
            )));
        }
        Ok(())
    }

    fn decision(&self, row: &SparseRow) -> ServeResult<Vec<f32>> {
        self.check_width(row)?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(weights, bias)| row.dot(weights) + bias)
            .collect())
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

impl Classifier for LinearClassifier {
    fn model_type(&self) -> &str {
        self.model_type.as_str()
    }

    fn capability(&self) -> ConfidenceCapability {
        match self.model_type {
            LinearKind::LogisticRegression => ConfidenceCapability::SupportsConfidence,
            LinearKind::LinearSvc => ConfidenceCapability::LabelOnly,
        }
    }

    fn n_features(&self) -> Option<usize> {
        self.coef.first().map(Vec::len)
    }

    fn predict(&self, row: &SparseRow) -> ServeResult<i64> {
        let scores = self.decision(row)?;
        let class_idx = if scores.len() == 1 {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(&scores)
        };
        self.classes
            .get(class_idx)
            .copied()
            .ok_or_else(|| ServeError::inference(format!("no class at index {class_idx}")))
    }

    fn predict_proba(&self, row: &SparseRow) -> ServeResult<Vec<f32>> {
        if self.model_type != LinearKind::LogisticRegression {
            return Err(ServeError::inference(format!(
                "{} does not expose class probabilities",
                self.model_type.as_str()
            )));
        }
        let scores = self.decision(row)?;
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            Ok(vec![1.0 - p, p])
        } else {
            Ok(softmax(&scores))
        }
    }

    fn has_feature_importances(&self) -> bool {
        self.feature_importances.is_some()
    }
}
