//! Model domain: artifacts, the stores they are loaded from, and the runtime
//! state that gates readiness.

pub mod domain;
pub mod linear;
pub mod repo_fs;
pub mod repo_registry;
pub mod service;
pub mod state;
pub mod tfidf;

pub use domain::{
    ArtifactPair, ArtifactStore, Classifier, ConfidenceCapability, ModelVersion, Sentiment,
    SparseRow, Vectorizer,
};
pub use state::{LoadedModel, ModelInfo, ModelRuntime};
