//! Air quality HTTP endpoints.
//!
//! - POST /api/air_quality
//! - GET /api/air_quality/history?limit=N

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::db::{models, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::services::pipeline::{AirQualityRequest, SnapshotService};
use crate::services::snapshot::EnvironmentSnapshot;

/// Default number of rows returned by the history endpoint.
const DEFAULT_HISTORY_LIMIT: i64 = 50;
/// Upper bound for the `limit` query parameter.
const MAX_HISTORY_LIMIT: i64 = 500;

/// Shared application state for air quality endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pool: SqlitePool,
    pub(crate) service: SnapshotService,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of rows to return (1-500, default 50)
    pub limit: Option<i64>,
}

/// Fetch, store and return a snapshot for a place name or a coordinate pair.
///
/// A non-empty `location` is geocoded and takes precedence over `lat`/`lon`.
/// A body sent without a JSON content type is read as an empty request.
#[utoipa::path(
    post,
    path = "/api/air_quality",
    tag = "Air Quality",
    request_body = AirQualityRequest,
    responses(
        (status = 200, description = "Current air quality and weather", body = EnvironmentSnapshot),
        (status = 400, description = "Unknown location, missing input or malformed body", body = ErrorResponse),
        (status = 500, description = "Upstream unavailable or unexpected error", body = ErrorResponse),
    )
)]
pub(crate) async fn submit_air_quality(
    State(state): State<AppState>,
    payload: Result<Json<AirQualityRequest>, JsonRejection>,
) -> Result<Json<EnvironmentSnapshot>, AppError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => AirQualityRequest::default(),
        Err(e) => return Err(AppError::MalformedPayload(e.body_text())),
    };

    let snapshot = state.service.handle(request).await?;
    Ok(Json(snapshot))
}

/// List the most recently stored snapshots, newest first.
#[utoipa::path(
    get,
    path = "/api/air_quality/history",
    tag = "Air Quality",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Stored snapshots", body = Vec<models::StoredSnapshot>),
        (status = 500, description = "Database error", body = ErrorResponse),
    )
)]
pub(crate) async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<models::StoredSnapshot>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let rows = queries::recent_snapshots(&state.pool, limit).await?;
    Ok(Json(rows))
}
