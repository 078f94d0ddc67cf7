//! Inference engine and batch coordinator.

use std::time::Instant;

use tracing::{debug, error, warn};

use crate::common::error::{ServeError, ServeResult};
use crate::common::time;
use crate::data::normalize;
use crate::model::{ConfidenceCapability, LoadedModel, ModelRuntime, Sentiment};

use super::domain::{BatchOutcome, BatchPredictionResult, PredictionResult, LABEL_ONLY_CONFIDENCE};

/// Characters of an input kept in failure logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// Predict the sentiment of one raw text.
pub fn predict(runtime: &ModelRuntime, raw_text: &str) -> ServeResult<PredictionResult> {
    infer(runtime, raw_text).inspect_err(|err| {
        if let ServeError::Inference(_) = err {
            error!(error = %err, "prediction failed");
        }
    })
}

/// Run every item through the engine, keeping each item's result.
pub fn batch_outcome(runtime: &ModelRuntime, texts: &[String]) -> BatchOutcome {
    BatchOutcome {
        results: texts.iter().map(|text| infer(runtime, text)).collect(),
    }
}

/// Batch prediction that drops failed items and never fails as a whole.
pub fn predict_batch(runtime: &ModelRuntime, texts: &[String]) -> BatchPredictionResult {
    let outcome = batch_outcome(runtime, texts);
    let mut not_ready = 0usize;
    for (index, err) in outcome.failures() {
        if let ServeError::ModelNotReady = err {
            not_ready += 1;
            continue;
        }
        error!(
            index,
            text = %preview(&texts[index]),
            error = %err,
            "dropping batch item"
        );
    }
    if not_ready > 0 {
        warn!(dropped = not_ready, "model not loaded, dropping batch items");
    }
    let result = outcome.into_result();
    debug!(
        requested = texts.len(),
        succeeded = result.total_count,
        "batch prediction"
    );
    result
}

/// Engine path shared by single and batch prediction. Logs nothing on failure.
fn infer(runtime: &ModelRuntime, raw_text: &str) -> ServeResult<PredictionResult> {
    let loaded = runtime.loaded()?;
    let start = Instant::now();

    let normalized = normalize(raw_text);
    let (sentiment, confidence) = score(loaded, &normalized).map_err(into_inference)?;

    debug!(
        sentiment = sentiment.as_i8(),
        confidence,
        latency_us = start.elapsed().as_micros() as u64,
        "prediction"
    );

    Ok(PredictionResult {
        text: raw_text.to_string(),
        sentiment,
        confidence,
        timestamp: time::now_utc(),
    })
}

fn score(loaded: &LoadedModel, normalized: &str) -> ServeResult<(Sentiment, f32)> {
    let row = loaded.vectorizer().transform(normalized)?;
    let model = loaded.model();
    let sentiment = Sentiment::try_from(model.predict(&row)?)?;
    let confidence = match loaded.capability() {
        ConfidenceCapability::SupportsConfidence => max_probability(&model.predict_proba(&row)?)?,
        ConfidenceCapability::LabelOnly => LABEL_ONLY_CONFIDENCE,
    };
    Ok((sentiment, confidence))
}

fn max_probability(probabilities: &[f32]) -> ServeResult<f32> {
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(ServeError::inference("model returned non-finite probabilities"));
    }
    let max = probabilities
        .iter()
        .copied()
        .reduce(f32::max)
        .ok_or_else(|| ServeError::inference("model returned no probabilities"))?;
    if !(-1e-6..=1.0 + 1e-6).contains(&max) {
        return Err(ServeError::inference(format!("probability {max} outside [0, 1]")));
    }
    Ok(max.clamp(0.0, 1.0))
}

/// Every failure past the readiness check surfaces as an inference error.
fn into_inference(err: ServeError) -> ServeError {
    match err {
        ServeError::Inference(_) => err,
        other => ServeError::inference(other.to_string()),
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}
