//! Canonical snapshot types and the normalizer that builds them.
//!
//! `normalize` is a pure function: the caller supplies the clock, so the same
//! raw payloads and the same instant always produce the same snapshot.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::openweather::RawEnvironment;

/// City name used when the weather payload carries none.
const UNKNOWN_CITY: &str = "Unknown";

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Pollutant concentrations in µg/m³ plus the upstream air quality category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PollutantReading {
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    /// Upstream air quality index category (1 = good .. 5 = very poor).
    /// Not the US EPA 0-500 scale.
    pub aqi: i64,
}

/// Current weather at the snapshot location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeatherReading {
    /// Air temperature in Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: i64,
    /// Visibility in metres
    pub visibility: f64,
    /// Wind speed in metres per second
    pub wind_speed: f64,
    /// Sea-level pressure in hPa
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

/// One normalized, timestamped air quality + weather record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentSnapshot {
    pub air_quality: PollutantReading,
    pub weather: WeatherReading,
    pub location: SnapshotLocation,
    /// ISO 8601 UTC instant at which the snapshot was normalized
    pub timestamp: String,
}

/// Merge resolved coordinates and both upstream payloads into a snapshot.
pub fn normalize(
    coords: Coordinates,
    raw: &RawEnvironment,
    now: DateTime<Utc>,
) -> EnvironmentSnapshot {
    let components = &raw.pollution.components;
    let main = &raw.weather.main;

    let city = raw
        .weather
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_CITY)
        .to_string();

    EnvironmentSnapshot {
        air_quality: PollutantReading {
            pm25: concentration(components.pm2_5),
            pm10: concentration(components.pm10),
            o3: concentration(components.o3),
            no2: concentration(components.no2),
            so2: concentration(components.so2),
            co: concentration(components.co),
            aqi: raw.pollution.main.aqi,
        },
        weather: WeatherReading {
            temperature: main.temp,
            humidity: main.humidity.round() as i64,
            visibility: raw.weather.visibility.unwrap_or(0.0),
            wind_speed: raw.weather.wind.speed,
            pressure: main.pressure,
        },
        location: SnapshotLocation {
            latitude: coords.latitude,
            longitude: coords.longitude,
            city,
        },
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Missing, negative or non-finite concentrations read as zero.
fn concentration(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
