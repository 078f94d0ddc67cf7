//! Application state shared by every request handler.

use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::{ArtifactLoadError, ServeResult};
use crate::common::log;
use crate::model::{service as model_service, ModelRuntime};

/// Configuration plus the model runtime. Built once at startup and passed by
/// reference into handlers; read-only once serving starts.
#[derive(Debug)]
pub struct AppState {
    cfg: AppCfg,
    runtime: ModelRuntime,
}

impl AppState {
    pub fn new(cfg: AppCfg, runtime: ModelRuntime) -> Self {
        Self { cfg, runtime }
    }

    /// State before the startup load. Every prediction reports not-ready.
    pub fn unloaded(cfg: AppCfg) -> Self {
        Self::new(cfg, ModelRuntime::unloaded())
    }

    /// Load artifacts per `cfg`. The error is fatal to startup.
    pub fn bootstrap(cfg: AppCfg) -> ServeResult<Self> {
        let runtime = model_service::load(&cfg)?;
        Ok(Self::new(cfg, runtime))
    }

    /// Full process startup: environment config, logging, artifact load.
    pub fn from_env() -> ServeResult<Self> {
        let cfg = AppCfg::load()?;
        log::init(&cfg.log_level);
        info!(bind = %cfg.bind_addr(), "starting sentiment service");
        Self::bootstrap(cfg)
    }

    /// Run the startup load on an unloaded state.
    pub fn load(&mut self) -> Result<(), ArtifactLoadError> {
        let store = model_service::store_for(&self.cfg);
        self.runtime.load(store.as_ref())
    }

    pub fn runtime(&self) -> &ModelRuntime {
        &self.runtime
    }
}
