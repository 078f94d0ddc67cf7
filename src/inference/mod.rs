//! Inference domain providing synchronous and batch prediction APIs.

pub mod domain;
pub mod service;

pub use domain::{
    BatchPredictionRequest, BatchPredictionResult, PredictionRequest, PredictionResult,
    MAX_BATCH_SIZE,
};
pub use service::{predict, predict_batch};
