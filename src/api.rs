//! HTTP API
//!
//! Endpoints:
//! - GET  /health - Health check
//! - POST /api/diagnostics - Score and store a submission
//! - GET  /api/diagnostics - Caller's history, newest first
//! - GET  /api/diagnostics/:id - One stored diagnostic
//! - POST /api/ai/report - Narrative report for a stored diagnostic
//!
//! The caller is identified by the `x-user-id` header set by the identity
//! provider in front of this service.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::calculator::calculate_diagnostic;
use crate::models::{Diagnostic, DiagnosticInput};
use crate::narrative::{NarrativeError, ReportGenerator};
use crate::store::DiagnosticStore;
use crate::validation::{validate_input, InputError};

pub const USER_HEADER: &str = "x-user-id";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DiagnosticStore>,
    pub reports: Arc<dyn ReportGenerator>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or invalid x-user-id header")]
    Unauthorized,

    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("{0}")]
    BadRequest(String),

    #[error("diagnostic not found")]
    NotFound,

    #[error(transparent)]
    Report(#[from] NarrativeError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Report(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(err) => tracing::error!(error = ?err, "request failed"),
            ApiError::Report(err) => tracing::warn!(%err, "report generation failed"),
            _ => {}
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Opaque identity of the caller.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(UserId)
            .ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub report_backend: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "diagnosticId")]
    pub diagnostic_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/diagnostics", post(create_diagnostic).get(list_diagnostics))
        .route("/api/diagnostics/:id", get(get_diagnostic))
        .route("/api/ai/report", post(generate_report))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        report_backend: state.reports.name().to_string(),
    })
}

async fn create_diagnostic(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    body: Result<Json<DiagnosticInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(input) = body?;
    validate_input(&input)?;

    tracing::debug!(?input, "scoring submission");
    let result = calculate_diagnostic(&input);
    let diagnostic = state.store.insert(user_id, &result).await?;
    tracing::info!(
        id = %diagnostic.id,
        %user_id,
        score = result.discipline_score,
        "diagnostic stored"
    );

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: diagnostic.id })))
}

async fn list_diagnostics(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    query: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<Diagnostic>>, ApiError> {
    let Query(params) = query?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let diagnostics = state.store.list_for_user(user_id, limit).await?;
    Ok(Json(diagnostics))
}

async fn get_diagnostic(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> Result<Json<Diagnostic>, ApiError> {
    let diagnostic = state
        .store
        .get_for_user(id, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(diagnostic))
}

async fn generate_report(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(req) = body?;
    let id = req
        .diagnostic_id
        .ok_or_else(|| ApiError::BadRequest("diagnosticId is required".to_string()))?;

    let diagnostic = state
        .store
        .get_for_user(id, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let reports = Arc::clone(&state.reports);
    let metrics = diagnostic.result;
    let report = tokio::task::spawn_blocking(move || reports.generate(&metrics))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    Ok(Json(ReportResponse { report }))
}

pub async fn run_server(addr: &str, state: AppState) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "diagnostic API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
