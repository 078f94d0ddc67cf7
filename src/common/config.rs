//! Runtime configuration loaded from the process environment.

use std::env;
use std::path::PathBuf;

use crate::common::error::{ServeError, ServeResult};

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq)]
pub struct AppCfg {
    /// Registry model location. When set, artifacts are loaded from the registry.
    pub registry_uri: Option<String>,
    /// Root directory `models:/` URIs resolve under.
    pub registry_root: PathBuf,
    pub model_path: PathBuf,
    pub vectorizer_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            registry_uri: None,
            registry_root: PathBuf::from("mlruns/models"),
            model_path: PathBuf::from("sentiment_model.json"),
            vectorizer_path: PathBuf::from("tfidf_vectorizer.json"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> ServeResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ServeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ServeError::Config(format!("PORT must be a port number, got {raw:?}")))?,
            None => defaults.port,
        };

        Ok(Self {
            registry_uri: get("MLFLOW_MODEL_URI"),
            registry_root: get("SENTIMENT_REGISTRY_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_root),
            model_path: get("SENTIMENT_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            vectorizer_path: get("SENTIMENT_VECTORIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vectorizer_path),
            host: get("HOST").unwrap_or(defaults.host),
            port,
            log_level: get("SENTIMENT_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// `host:port` the external transport should bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
