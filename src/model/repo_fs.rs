//! Filesystem store for the vectorizer/model artifact pair.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::common::config::AppCfg;
use crate::common::error::ArtifactLoadError;

use super::domain::{ArtifactPair, ArtifactStore, ModelVersion};
use super::linear::LinearClassifier;
use super::tfidf::TfidfVectorizer;

/// Artifact file names, shared with registry directories.
pub const MODEL_FILE: &str = "sentiment_model.json";
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";

/// Load a matched pair from two files on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    model_path: PathBuf,
    vectorizer_path: PathBuf,
    version: ModelVersion,
}

impl FsArtifactStore {
    /// Local pair from the configured paths, reported as `local_v1.0`.
    pub fn new(cfg: &AppCfg) -> Self {
        Self::with_paths(
            &cfg.model_path,
            &cfg.vectorizer_path,
            ModelVersion::new(ModelVersion::LOCAL),
        )
    }

    /// Pair stored inside one directory under the standard file names.
    pub fn in_dir(dir: &Path, version: ModelVersion) -> Self {
        Self::with_paths(&dir.join(MODEL_FILE), &dir.join(VECTORIZER_FILE), version)
    }

    pub fn with_paths(model_path: &Path, vectorizer_path: &Path, version: ModelVersion) -> Self {
        Self {
            model_path: model_path.to_path_buf(),
            vectorizer_path: vectorizer_path.to_path_buf(),
            version,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadError> {
    let bytes = fs::read(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn incompatible(path: &Path, msg: String) -> ArtifactLoadError {
    ArtifactLoadError::Incompatible(format!("{}: {msg}", path.display()))
}

impl ArtifactStore for FsArtifactStore {
    fn describe(&self) -> String {
        format!(
            "local files (model: {}, vectorizer: {})",
            self.model_path.display(),
            self.vectorizer_path.display()
        )
    }

    fn load(&self) -> Result<ArtifactPair, ArtifactLoadError> {
        if !self.model_path.is_file() || !self.vectorizer_path.is_file() {
            return Err(ArtifactLoadError::MissingArtifacts {
                model: self.model_path.clone(),
                vectorizer: self.vectorizer_path.clone(),
            });
        }

        let vectorizer: TfidfVectorizer = read_json(&self.vectorizer_path)?;
        vectorizer
            .validate()
            .map_err(|msg| incompatible(&self.vectorizer_path, msg))?;

        let model: LinearClassifier = read_json(&self.model_path)?;
        model
            .validate()
            .map_err(|msg| incompatible(&self.model_path, msg))?;

        Ok(ArtifactPair {
            vectorizer: Box::new(vectorizer),
            model: Box::new(model),
            version: self.version.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::common::error::ArtifactLoadReason;

    pub(crate) const VECTORIZER_JSON: &str = r#"{
        "vocabulary": {"awful": 0, "fine": 1, "great": 2, "love": 3, "terrible": 4},
        "idf": [1.2, 1.0, 1.1, 1.3, 1.4]
    }"#;

    pub(crate) const MODEL_JSON: &str = r#"{
        "model_type": "logistic_regression",
        "classes": [-1, 0, 1],
        "coef": [
            [3.0, 0.0, -1.0, -1.0, 3.0],
            [0.0, 2.0, 0.0, 0.0, 0.0],
            [-1.0, 0.0, 3.0, 3.0, -1.0]
        ],
        "intercept": [0.0, 0.3, 0.0],
        "feature_importances": [5.0, 1.0, 4.0, 6.0, 2.0]
    }"#;

    pub(crate) fn write_pair(dir: &Path, model: &str, vectorizer: &str) {
        fs::write(dir.join(MODEL_FILE), model).unwrap();
        fs::write(dir.join(VECTORIZER_FILE), vectorizer).unwrap();
    }

    #[test]
    fn loads_valid_pair() {
        let dir = TempDir::new().unwrap();
        write_pair(dir.path(), MODEL_JSON, VECTORIZER_JSON);

        let pair = FsArtifactStore::in_dir(dir.path(), ModelVersion::new("local_v1.0"))
            .load()
            .unwrap();
        assert_eq!(pair.version.as_str(), "local_v1.0");
        assert_eq!(pair.vectorizer.width(), 5);
        assert_eq!(pair.model.n_features(), Some(5));
        assert_eq!(pair.model.model_type(), "LogisticRegression");
    }

    #[test]
    fn missing_either_file_is_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MODEL_FILE), MODEL_JSON).unwrap();

        let err = FsArtifactStore::in_dir(dir.path(), ModelVersion::unknown())
            .load()
            .unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::MissingArtifacts);
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        write_pair(dir.path(), MODEL_JSON, "not json at all");

        let err = FsArtifactStore::in_dir(dir.path(), ModelVersion::unknown())
            .load()
            .unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::Corrupt);
    }

    #[test]
    fn inconsistent_model_is_incompatible() {
        let dir = TempDir::new().unwrap();
        let model = r#"{"model_type":"linear_svc","classes":[-1,1],"coef":[[1.0]],"intercept":[]}"#;
        write_pair(dir.path(), model, VECTORIZER_JSON);

        let err = FsArtifactStore::in_dir(dir.path(), ModelVersion::unknown())
            .load()
            .unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::Incompatible);
    }
}
