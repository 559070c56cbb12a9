// src/server.rs
use axum::http::StatusCode;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::capacity::{calculate_available_capacity, calculate_weekly_capacity, weekly_breakdown};
use crate::models::{
    Absence, AnalysisPeriod, CapacityResult, Employee, PublicHoliday, Snapshot, UtilizationReport,
    WeeklyCapacity,
};
use crate::report::build_utilization_report;
use crate::source::{RecordSource, SourceError};
use crate::validation::{ValidationOutcome, ValidationRequest};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Provide both start and end dates, or at least one week")]
    InvalidPeriod,

    #[error("No record source configured")]
    SourceUnavailable,

    #[error("Loading records failed: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::InvalidPeriod => StatusCode::BAD_REQUEST,
            ApiError::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Source(source_err) => {
                error!("Record source failure: {:?}", source_err);
                StatusCode::BAD_GATEWAY
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when neither a data file nor a backend is configured; only the
    /// body-driven endpoints work then.
    pub source: Option<Arc<dyn RecordSource>>,
}

impl AppState {
    pub fn new(source: Option<Arc<dyn RecordSource>>) -> Self {
        Self { source }
    }
}

// --- Request / Response Bodies ---

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationRequest {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub weeks: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    pub employee: Employee,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub weeks: Vec<NaiveDate>,
    #[serde(default)]
    pub holidays: Vec<PublicHoliday>,
    #[serde(default)]
    pub absences: Vec<Absence>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityResponse {
    #[serde(flatten)]
    pub capacity: CapacityResult,
    /// Per-week rows, only present when the request named weeks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weeks: Vec<WeeklyCapacity>,
}

impl CapacityRequest {
    pub fn evaluate(&self) -> Result<CapacityResponse, ApiError> {
        if !self.weeks.is_empty() {
            return Ok(CapacityResponse {
                capacity: calculate_weekly_capacity(
                    &self.employee,
                    &self.weeks,
                    &self.holidays,
                    &self.absences,
                ),
                weeks: weekly_breakdown(&self.employee, &self.weeks, &self.holidays, &self.absences),
            });
        }
        let period = AnalysisPeriod::resolve(self.start, self.end, &[]).ok_or(ApiError::InvalidPeriod)?;
        Ok(CapacityResponse {
            capacity: calculate_available_capacity(
                &self.employee,
                period.start,
                period.end,
                &self.holidays,
                &self.absences,
            ),
            weeks: Vec::new(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    source: Option<String>,
}

// --- Router ---

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/utilization",
            get(handle_get_utilization).post(handle_post_utilization),
        )
        .route("/capacity", post(handle_capacity))
        .route("/validate", post(handle_validate));

    Router::new()
        .nest("/api", api_routes)
        .route("/status", get(handle_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting server on http://{}", addr);
    axum::serve(listener, router(state)).await
}

// --- Handlers ---

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        source: state.source.as_ref().map(|source| source.describe()),
    })
}

async fn handle_get_utilization(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<UtilizationReport>, ApiError> {
    let period = AnalysisPeriod::resolve(query.start, query.end, &[]).ok_or(ApiError::InvalidPeriod)?;
    let source = state.source.as_ref().ok_or_else(|| {
        warn!("Utilization requested but no record source is configured");
        ApiError::SourceUnavailable
    })?;
    info!(
        "Handling GET /api/utilization for {}..{} from {}",
        period.start,
        period.end,
        source.describe()
    );
    let snapshot = source.load_snapshot(&period).await?;
    Ok(Json(build_utilization_report(&snapshot, period)))
}

async fn handle_post_utilization(
    Json(request): Json<UtilizationRequest>,
) -> Result<Json<UtilizationReport>, ApiError> {
    let period = AnalysisPeriod::resolve(request.start, request.end, &request.weeks)
        .ok_or(ApiError::InvalidPeriod)?;
    info!(
        "Handling POST /api/utilization for {}..{} ({} employees)",
        period.start,
        period.end,
        request.snapshot.employees.len()
    );
    Ok(Json(build_utilization_report(&request.snapshot, period)))
}

async fn handle_capacity(
    Json(request): Json<CapacityRequest>,
) -> Result<Json<CapacityResponse>, ApiError> {
    Ok(Json(request.evaluate()?))
}

async fn handle_validate(Json(request): Json<ValidationRequest>) -> Json<ValidationOutcome> {
    Json(request.evaluate())
}
