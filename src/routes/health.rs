use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

/// Liveness report for the AirGuard API.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the snapshot store cannot be queried
    pub status: String,
    /// Crate version of the running binary
    pub version: String,
    /// Whether the SQLite snapshot store answered
    pub database: bool,
}

impl HealthResponse {
    fn new(store_reachable: bool) -> Self {
        let status = if store_reachable { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: store_reachable,
        }
    }
}

/// Report whether the API is up and its snapshot store is usable.
///
/// Snapshot requests still succeed without the store (persistence is
/// best-effort), so an unreachable store is reported as "degraded" with 200.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "API is serving requests", body = HealthResponse),
    )
)]
pub async fn health_check(State(pool): State<SqlitePool>) -> Json<HealthResponse> {
    let store_reachable = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM air_quality")
        .fetch_one(&pool)
        .await
        .is_ok();

    if !store_reachable {
        tracing::warn!("Health check: snapshot store unreachable");
    }

    Json(HealthResponse::new(store_reachable))
}
