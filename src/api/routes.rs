//! Transport-agnostic request router.
//!
//! A host transport turns its requests into [`ApiRequest`] and writes the
//! returned [`ApiResponse`] status and JSON body back to the client.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::common::error::{ServeError, ServeResult};
use crate::common::time;
use crate::inference::{self, BatchPredictionRequest, PredictionRequest};

use super::state::AppState;

pub const SERVICE_NAME: &str = "Sentiment Analysis API";
pub const API_VERSION: &str = "1.0.0";

const ROUTES: [&str; 5] = ["/", "/health", "/predict", "/predict/batch", "/model/info"];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Other,
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("GET") {
            Method::Get
        } else if raw.eq_ignore_ascii_case("POST") {
            Method::Post
        } else {
            Method::Other
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
        }
    }

    /// Path without query string or trailing slash.
    fn route(&self) -> &str {
        let path = self.path.split('?').next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok<T: Serialize>(payload: &T) -> ServeResult<Self> {
        let body = serde_json::to_value(payload)
            .map_err(|err| ServeError::Internal(format!("response encoding failed: {err}")))?;
        Ok(Self { status: 200, body })
    }

    pub fn from_error(err: &ServeError) -> Self {
        Self {
            status: err.http_status(),
            body: json!({ "detail": err.public_detail() }),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":500,"body":{"detail":"Internal Server Error"}}"#.to_string())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub model_version: String,
    #[serde(serialize_with = "time::serialize_iso")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct RootInfo {
    message: &'static str,
    version: &'static str,
}

/// Dispatch one request against `state`.
pub fn handle(state: &AppState, req: &ApiRequest) -> ApiResponse {
    let route = req.route();
    let result = match (req.method, route) {
        (Method::Get, "/") => root(),
        (Method::Get, "/health") => health(state),
        (Method::Post, "/predict") => predict(state, req.body.as_deref()),
        (Method::Post, "/predict/batch") => predict_batch(state, req.body.as_deref()),
        (Method::Get, "/model/info") => model_info(state),
        (_, path) if ROUTES.contains(&path) => Err(ServeError::MethodNotAllowed),
        _ => Err(ServeError::NotFound),
    };

    let response = result.unwrap_or_else(|err| ApiResponse::from_error(&err));
    debug!(method = ?req.method, route, status = response.status, "handled request");
    response
}

fn parse_body<T: DeserializeOwned>(body: Option<&str>) -> ServeResult<T> {
    let body = body.ok_or_else(|| ServeError::invalid("request body is required"))?;
    serde_json::from_str(body).map_err(|err| ServeError::invalid(format!("invalid request body: {err}")))
}

fn root() -> ServeResult<ApiResponse> {
    ApiResponse::ok(&RootInfo {
        message: SERVICE_NAME,
        version: API_VERSION,
    })
}

fn health(state: &AppState) -> ServeResult<ApiResponse> {
    let runtime = state.runtime();
    let ready = runtime.is_ready();
    ApiResponse::ok(&HealthReport {
        status: if ready {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        model_loaded: ready,
        model_version: runtime.current_version().to_string(),
        timestamp: time::now_utc(),
    })
}

fn predict(state: &AppState, body: Option<&str>) -> ServeResult<ApiResponse> {
    let request: PredictionRequest = parse_body(body)?;
    request.validate()?;
    let result = inference::predict(state.runtime(), &request.text)?;
    ApiResponse::ok(&result)
}

fn predict_batch(state: &AppState, body: Option<&str>) -> ServeResult<ApiResponse> {
    let request: BatchPredictionRequest = parse_body(body)?;
    request.validate()?;
    let result = inference::predict_batch(state.runtime(), &request.texts);
    ApiResponse::ok(&result)
}

fn model_info(state: &AppState) -> ServeResult<ApiResponse> {
    let loaded = state.runtime().loaded()?;
    ApiResponse::ok(&loaded.info())
}
