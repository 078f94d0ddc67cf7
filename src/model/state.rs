//! Model runtime state: `Unloaded` until the startup load succeeds, then
//! `Loaded` for the rest of the process lifetime.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::common::error::{ArtifactLoadError, ServeError, ServeResult};
use crate::common::time;

use super::domain::{
    ArtifactPair, ArtifactStore, Classifier, ConfidenceCapability, ModelVersion, Vectorizer,
};

static NO_VOCABULARY: BTreeMap<String, usize> = BTreeMap::new();

/// A vectorizer and model that were loaded together.
pub struct LoadedModel {
    vectorizer: Box<dyn Vectorizer>,
    model: Box<dyn Classifier>,
    version: ModelVersion,
    capability: ConfidenceCapability,
    loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    /// Accept a pair if the model's feature width matches the vectorizer.
    pub fn from_pair(pair: ArtifactPair) -> Result<Self, ArtifactLoadError> {
        let width = pair.vectorizer.width();
        if let Some(expected) = pair.model.n_features() {
            if expected != width {
                return Err(ArtifactLoadError::Incompatible(format!(
                    "model expects {expected} features, vectorizer produces {width}"
                )));
            }
        }
        let capability = pair.model.capability();
        Ok(Self {
            vectorizer: pair.vectorizer,
            model: pair.model,
            version: pair.version,
            capability,
            loaded_at: time::now_utc(),
        })
    }

    pub fn vectorizer(&self) -> &dyn Vectorizer {
        self.vectorizer.as_ref()
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn version(&self) -> &ModelVersion {
        &self.version
    }

    pub fn capability(&self) -> ConfidenceCapability {
        self.capability
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn info(&self) -> ModelInfo<'_> {
        ModelInfo {
            model_type: self.model.model_type(),
            model_version: self.version.as_str(),
            loaded_at: self.loaded_at,
            features_expected: self.vectorizer.vocabulary().unwrap_or(&NO_VOCABULARY),
            has_feature_importances: self.model.has_feature_importances().then_some(true),
        }
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model_type", &self.model.model_type())
            .field("version", &self.version)
            .field("capability", &self.capability)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Payload of `GET /model/info`.
#[derive(Debug, Serialize)]
pub struct ModelInfo<'a> {
    pub model_type: &'a str,
    pub model_version: &'a str,
    #[serde(serialize_with = "time::serialize_iso")]
    pub loaded_at: DateTime<Utc>,
    /// Vocabulary term to column; empty when the vectorizer exposes none.
    pub features_expected: &'a BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_feature_importances: Option<bool>,
}

/// Process-scoped holder of the loaded artifacts.
#[derive(Debug, Default)]
pub enum ModelRuntime {
    #[default]
    Unloaded,
    Loaded(LoadedModel),
}

impl ModelRuntime {
    pub fn unloaded() -> Self {
        Self::Unloaded
    }

    /// Load the pair from `store`. Only an `Unloaded` runtime accepts a load,
    /// and a failed load leaves it `Unloaded`.
    pub fn load(&mut self, store: &dyn ArtifactStore) -> Result<(), ArtifactLoadError> {
        if let Self::Loaded(current) = self {
            warn!(version = %current.version, "refusing to reload model artifacts");
            return Err(ArtifactLoadError::AlreadyLoaded(current.version.to_string()));
        }

        let source = store.describe();
        let loaded = match store.load().and_then(LoadedModel::from_pair) {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(%source, error = %err, "failed to load model artifacts");
                return Err(err);
            }
        };
        info!(
            %source,
            version = %loaded.version,
            model_type = loaded.model.model_type(),
            features = loaded.vectorizer.width(),
            capability = ?loaded.capability,
            "model artifacts loaded"
        );

        *self = Self::Loaded(loaded);
        Ok(())
    }

    /// Convenience for startup: a runtime loaded from `store`, or the error.
    pub fn from_store(store: &dyn ArtifactStore) -> Result<Self, ArtifactLoadError> {
        let mut runtime = Self::unloaded();
        runtime.load(store)?;
        Ok(runtime)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn current_version(&self) -> ModelVersion {
        match self {
            Self::Loaded(loaded) => loaded.version.clone(),
            Self::Unloaded => ModelVersion::unknown(),
        }
    }

    /// The loaded artifacts, or `ModelNotReady`.
    pub fn loaded(&self) -> ServeResult<&LoadedModel> {
        match self {
            Self::Loaded(loaded) => Ok(loaded),
            Self::Unloaded => Err(ServeError::ModelNotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::common::error::ArtifactLoadReason;
    use crate::model::domain::SparseRow;
    use crate::model::linear::{LinearClassifier, LinearKind};
    use crate::model::tfidf::TfidfVectorizer;

    struct StaticStore {
        width: usize,
        kind: LinearKind,
    }

    impl ArtifactStore for StaticStore {
        fn describe(&self) -> String {
            "static".to_string()
        }

        fn load(&self) -> Result<ArtifactPair, ArtifactLoadError> {
            let vocab: BTreeMap<String, usize> =
                [("good".to_string(), 0), ("bad".to_string(), 1)].into();
            Ok(ArtifactPair {
                vectorizer: Box::new(TfidfVectorizer::new(vocab, vec![1.0, 1.0])),
                model: Box::new(LinearClassifier::new(
                    self.kind,
                    vec![-1, 1],
                    vec![vec![1.0; self.width]],
                    vec![0.0],
                )),
                version: ModelVersion::new("test_v1"),
            })
        }
    }

    struct FailingStore;

    impl ArtifactStore for FailingStore {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        fn load(&self) -> Result<ArtifactPair, ArtifactLoadError> {
            Err(ArtifactLoadError::Registry("offline".to_string()))
        }
    }

    struct NoVocab;

    impl Vectorizer for NoVocab {
        fn width(&self) -> usize {
            1
        }

        fn transform(&self, _text: &str) -> ServeResult<SparseRow> {
            Ok(SparseRow::zeros(1))
        }
    }

    #[test]
    fn starts_unloaded() {
        let runtime = ModelRuntime::unloaded();
        assert!(!runtime.is_ready());
        assert_eq!(runtime.current_version().as_str(), "unknown");
        assert!(matches!(runtime.loaded(), Err(ServeError::ModelNotReady)));
    }

    #[test]
    fn successful_load_is_ready() {
        let store = StaticStore {
            width: 2,
            kind: LinearKind::LogisticRegression,
        };
        let runtime = ModelRuntime::from_store(&store).unwrap();
        assert!(runtime.is_ready());
        assert_eq!(runtime.current_version().as_str(), "test_v1");
        let loaded = runtime.loaded().unwrap();
        assert_eq!(loaded.capability(), ConfidenceCapability::SupportsConfidence);
    }

    #[test]
    fn failed_load_stays_unloaded() {
        let mut runtime = ModelRuntime::unloaded();
        let err = runtime.load(&FailingStore).unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::Registry);
        assert!(!runtime.is_ready());
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let store = StaticStore {
            width: 3,
            kind: LinearKind::LogisticRegression,
        };
        let mut runtime = ModelRuntime::unloaded();
        let err = runtime.load(&store).unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::Incompatible);
        assert!(!runtime.is_ready());
    }

    #[test]
    fn second_load_is_refused() {
        let store = StaticStore {
            width: 2,
            kind: LinearKind::LinearSvc,
        };
        let mut runtime = ModelRuntime::from_store(&store).unwrap();
        let err = runtime.load(&store).unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::AlreadyLoaded);
        assert!(runtime.is_ready());
        assert_eq!(
            runtime.loaded().unwrap().capability(),
            ConfidenceCapability::LabelOnly
        );
    }

    #[test]
    fn info_reports_vocabulary_and_omits_importances() {
        let store = StaticStore {
            width: 2,
            kind: LinearKind::LinearSvc,
        };
        let runtime = ModelRuntime::from_store(&store).unwrap();
        let info = serde_json::to_value(runtime.loaded().unwrap().info()).unwrap();
        assert_eq!(info["model_type"], "LinearSVC");
        assert_eq!(info["model_version"], "test_v1");
        assert_eq!(info["features_expected"]["good"], 0);
        assert!(info.get("has_feature_importances").is_none());
        assert!(info["loaded_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn info_without_vocabulary_is_an_empty_object() {
        let loaded = LoadedModel::from_pair(ArtifactPair {
            vectorizer: Box::new(NoVocab),
            model: Box::new(
                LinearClassifier::new(LinearKind::LinearSvc, vec![-1, 1], vec![vec![1.0]], vec![0.0])
                    .with_feature_importances(vec![1.0]),
            ),
            version: ModelVersion::new("v"),
        })
        .unwrap();
        let info = serde_json::to_value(loaded.info()).unwrap();
        assert_eq!(info["features_expected"], serde_json::json!({}));
        assert_eq!(info["has_feature_importances"], true);
    }
}
