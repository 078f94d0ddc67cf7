//! Sentiment prediction service core.
//!
//! Loads one vectorizer/model pair at startup and serves single and batch
//! predictions through a transport-agnostic router.

pub mod api;
pub mod common;
pub mod data;
pub mod inference;
pub mod model;

pub use api::{handle, ApiRequest, ApiResponse, AppState};
pub use common::{AppCfg, ServeError, ServeResult};
pub use data::normalize;
pub use inference::{predict, predict_batch};
pub use model::ModelRuntime;
