use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rvsizer_core::{SizingEngine, SizingOutcome, SizingSession, VmListing};
use rvsizer_loader::LoadError;
use rvsizer_types::ScopeOptions;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub const BODY_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SizingEngine>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/workbook/vms", post(workbook_vms))
        .route("/v1/sizing", post(sizing))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug)]
pub enum ApiError {
    Load(LoadError),
    BadRequest(String),
    Internal(String),
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        ApiError::Load(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Load(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!(%status, error = %message, "request failed");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(e.to_string())
}

/// Query string of `/v1/sizing`. Each `exclude` key names one VM, verbatim.
#[derive(Debug)]
struct SizingParams {
    exclude_powered_off: bool,
    exclude: Vec<String>,
}

impl SizingParams {
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut params = SizingParams {
            exclude_powered_off: true,
            exclude: Vec::new(),
        };
        for (key, value) in pairs {
            match key.as_str() {
                "exclude" if !value.is_empty() => params.exclude.push(value),
                "exclude" => {}
                "exclude_powered_off" => {
                    params.exclude_powered_off = match value.as_str() {
                        "true" | "1" => true,
                        "false" | "0" => false,
                        other => {
                            return Err(ApiError::BadRequest(format!(
                                "exclude_powered_off must be true or false, got '{other}'"
                            )))
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(params)
    }

    fn options(self) -> ScopeOptions {
        ScopeOptions::shared(self.exclude_powered_off, self.exclude)
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn workbook_vms(body: Bytes) -> Result<Json<Vec<VmListing>>, ApiError> {
    let session = SizingSession::from_workbook(&body)?;
    Ok(Json(session.vms().map_err(internal)?))
}

async fn sizing(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Json<SizingOutcome>, ApiError> {
    let options = SizingParams::from_pairs(pairs)?.options();
    let session = if body.is_empty() {
        None
    } else {
        Some(SizingSession::from_workbook(&body)?)
    };
    let outcome = state
        .engine
        .submit(session.as_ref(), &options)
        .await
        .map_err(internal)?;
    Ok(Json(outcome))
}
