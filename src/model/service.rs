//! Startup loading: pick the artifact store from configuration and build the
//! runtime state from it.

use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::ArtifactLoadError;

use super::domain::ArtifactStore;
use super::repo_fs::FsArtifactStore;
use super::repo_registry::RegistryArtifactStore;
use super::state::ModelRuntime;

/// Registry store when a registry location is configured, local files otherwise.
pub fn store_for(cfg: &AppCfg) -> Box<dyn ArtifactStore> {
    match &cfg.registry_uri {
        Some(uri) => Box::new(RegistryArtifactStore::new(uri.clone(), &cfg.registry_root)),
        None => Box::new(FsArtifactStore::new(cfg)),
    }
}

/// Load the model/vectorizer pair. Errors are startup-fatal.
pub fn load(cfg: &AppCfg) -> Result<ModelRuntime, ArtifactLoadError> {
    let store = store_for(cfg);
    info!(source = %store.describe(), "loading model artifacts");
    ModelRuntime::from_store(store.as_ref())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::common::error::ArtifactLoadReason;
    use crate::model::repo_fs::tests::{write_pair, MODEL_JSON, VECTORIZER_JSON};
    use crate::model::repo_fs::{MODEL_FILE, VECTORIZER_FILE};

    fn local_cfg(dir: &TempDir) -> AppCfg {
        AppCfg {
            model_path: dir.path().join(MODEL_FILE),
            vectorizer_path: dir.path().join(VECTORIZER_FILE),
            ..AppCfg::default()
        }
    }

    #[test]
    fn local_pair_reports_local_version() {
        let dir = TempDir::new().unwrap();
        write_pair(dir.path(), MODEL_JSON, VECTORIZER_JSON);

        let runtime = load(&local_cfg(&dir)).unwrap();
        assert!(runtime.is_ready());
        assert_eq!(runtime.current_version().as_str(), "local_v1.0");
    }

    #[test]
    fn nothing_configured_and_nothing_on_disk_is_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        let err = load(&local_cfg(&dir)).unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::MissingArtifacts);
    }

    #[test]
    fn registry_location_takes_precedence_over_local_files() {
        let local = TempDir::new().unwrap();
        write_pair(local.path(), MODEL_JSON, VECTORIZER_JSON);

        let registry = TempDir::new().unwrap();
        let stage = registry.path().join("sentiment").join("Production");
        fs::create_dir_all(&stage).unwrap();
        write_pair(&stage, MODEL_JSON, VECTORIZER_JSON);

        let cfg = AppCfg {
            registry_uri: Some("models:/sentiment/Production".to_string()),
            registry_root: registry.path().to_path_buf(),
            ..local_cfg(&local)
        };
        let runtime = load(&cfg).unwrap();
        assert_eq!(runtime.current_version().as_str(), "mlflow_latest");
    }

    #[test]
    fn broken_registry_does_not_fall_back_to_local_files() {
        let local = TempDir::new().unwrap();
        write_pair(local.path(), MODEL_JSON, VECTORIZER_JSON);

        let cfg = AppCfg {
            registry_uri: Some("https://registry.invalid/models/1".to_string()),
            ..local_cfg(&local)
        };
        let err = load(&cfg).unwrap_err();
        assert_eq!(err.reason(), ArtifactLoadReason::Registry);
    }
}
