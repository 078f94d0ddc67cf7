//! Error handling primitives shared across the core.
//!
//! `ServeError` is the crate-wide error. Startup artifact failures get their own
//! enum because they carry filesystem and decode sources the request path never
//! produces.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes that cross the C ABI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ServeCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Artifacts could not be loaded at startup.
    ArtifactLoad = 1,
    /// A request arrived before the model was loaded.
    ModelNotReady = 2,
    /// Vectorization or model invocation failed.
    Inference = 3,
    /// Input failed validation.
    InvalidInput = 4,
    /// Configuration could not be parsed.
    Config = 5,
    /// No route matches the request.
    NotFound = 6,
    /// Route exists but not for this method.
    MethodNotAllowed = 7,
    /// Catch-all for bugs and unexpected states.
    Internal = 8,
}

/// Kind of artifact load failure, independent of the underlying source error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArtifactLoadReason {
    MissingArtifacts,
    Io,
    Corrupt,
    Incompatible,
    Registry,
    AlreadyLoaded,
}

/// Startup-fatal failure while loading the vectorizer/model pair.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("model artifacts not found (model: {}, vectorizer: {})", model.display(), vectorizer.display())]
    MissingArtifacts { model: PathBuf, vectorizer: PathBuf },

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode artifact {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("incompatible artifacts: {0}")]
    Incompatible(String),

    #[error("registry load failed: {0}")]
    Registry(String),

    #[error("artifacts already loaded (version {0})")]
    AlreadyLoaded(String),
}

impl ArtifactLoadError {
    pub fn reason(&self) -> ArtifactLoadReason {
        match self {
            Self::MissingArtifacts { .. } => ArtifactLoadReason::MissingArtifacts,
            Self::Io { .. } => ArtifactLoadReason::Io,
            Self::Corrupt { .. } => ArtifactLoadReason::Corrupt,
            Self::Incompatible(_) => ArtifactLoadReason::Incompatible,
            Self::Registry(_) => ArtifactLoadReason::Registry,
            Self::AlreadyLoaded(_) => ArtifactLoadReason::AlreadyLoaded,
        }
    }
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    #[error("Model not loaded")]
    ModelNotReady,

    /// The detail is for logs only; the boundary reports a generic message.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type ServeResult<T> = Result<T, ServeError>;

impl ServeError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Inference helper.
    pub fn inference(detail: impl Into<String>) -> Self {
        Self::Inference(detail.into())
    }

    pub fn code(&self) -> ServeCode {
        match self {
            Self::ArtifactLoad(_) => ServeCode::ArtifactLoad,
            Self::ModelNotReady => ServeCode::ModelNotReady,
            Self::Inference(_) => ServeCode::Inference,
            Self::Validation(_) => ServeCode::InvalidInput,
            Self::Config(_) => ServeCode::Config,
            Self::NotFound => ServeCode::NotFound,
            Self::MethodNotAllowed => ServeCode::MethodNotAllowed,
            Self::Internal(_) => ServeCode::Internal,
        }
    }

    /// HTTP status the request boundary reports for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ModelNotReady => 503,
            Self::Validation(_) => 422,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::ArtifactLoad(_) | Self::Inference(_) | Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to a caller. Inference details stay in the logs.
    pub fn public_detail(&self) -> String {
        match self {
            Self::Inference(_) => "Prediction failed".to_string(),
            Self::ArtifactLoad(_) | Self::Config(_) | Self::Internal(_) => {
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        }
    }
}
