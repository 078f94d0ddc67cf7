//! Registry-backed artifact store.
//!
//! Supported locations: `models:/<name>/<stage-or-version>` under the registry
//! root, `file://<dir>`, or a bare directory path. Remote registries are not
//! reachable from here.

use std::path::{Component, Path, PathBuf};

use crate::common::error::ArtifactLoadError;

use super::domain::{ArtifactPair, ArtifactStore, ModelVersion};
use super::repo_fs::FsArtifactStore;

#[derive(Clone, Debug)]
pub struct RegistryArtifactStore {
    uri: String,
    root: PathBuf,
}

impl RegistryArtifactStore {
    pub fn new(uri: impl Into<String>, root: &Path) -> Self {
        Self {
            uri: uri.into(),
            root: root.to_path_buf(),
        }
    }

    /// Directory holding the artifact pair for this location.
    pub fn resolve(&self) -> Result<PathBuf, ArtifactLoadError> {
        let uri = self.uri.trim();

        if let Some(rest) = uri.strip_prefix("models:/") {
            let parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
            let [name, stage] = parts.as_slice() else {
                return Err(ArtifactLoadError::Registry(format!(
                    "expected models:/<name>/<stage>, got {uri:?}"
                )));
            };
            let rel = Path::new(name).join(stage);
            if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
                return Err(ArtifactLoadError::Registry(format!(
                    "model name and stage must be plain segments, got {uri:?}"
                )));
            }
            return Ok(self.root.join(rel));
        }

        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }

        // TODO: fetch http(s) registry locations once an HTTP client joins the stack.
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(ArtifactLoadError::Registry(format!(
                "unsupported registry scheme {scheme:?}"
            )));
        }

        Ok(PathBuf::from(uri))
    }
}

impl ArtifactStore for RegistryArtifactStore {
    fn describe(&self) -> String {
        format!("registry {}", self.uri)
    }

    fn load(&self) -> Result<ArtifactPair, ArtifactLoadError> {
        let dir = self.resolve()?;
        if !dir.is_dir() {
            return Err(ArtifactLoadError::Registry(format!(
                "{} resolved to {}, which is not a directory",
                self.uri,
                dir.display()
            )));
        }
        FsArtifactStore::in_dir(&dir, ModelVersion::new(ModelVersion::REGISTRY)).load()
    }
}
