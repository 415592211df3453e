use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A persisted row of the append-only `air_quality` table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct StoredSnapshot {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub aqi: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub visibility: f64,
    pub wind_speed: f64,
    /// ISO 8601 UTC instant the snapshot was taken
    pub timestamp: String,
}
