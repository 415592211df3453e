use std::time::Duration;

use crate::services::snapshot::Coordinates;

/// Default broadcast location (New Delhi).
const DEFAULT_BROADCAST_LAT: f64 = 28.6139;
const DEFAULT_BROADCAST_LON: f64 = 77.2090;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenWeatherMap API key. Required; there is no built-in fallback key.
    pub api_key: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL for every OpenWeatherMap endpoint (geocoding, pollution, weather).
    pub openweather_base_url: String,
    /// Per-call timeout for upstream requests.
    pub upstream_timeout: Duration,
    /// Fixed location pushed to real-time subscribers.
    pub broadcast_location: Coordinates,
    pub broadcast_interval: Duration,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: var("API_KEY")
                .filter(|k| !k.trim().is_empty())
                .expect("API_KEY must be set"),
            port: var("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://air_quality.db".to_string()),
            openweather_base_url: var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|| "https://api.openweathermap.org".to_string()),
            upstream_timeout: Duration::from_secs(
                var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .expect("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds"),
            ),
            broadcast_location: Coordinates {
                latitude: var("BROADCAST_LAT")
                    .map(|v| v.parse().expect("BROADCAST_LAT must be a number"))
                    .unwrap_or(DEFAULT_BROADCAST_LAT),
                longitude: var("BROADCAST_LON")
                    .map(|v| v.parse().expect("BROADCAST_LON must be a number"))
                    .unwrap_or(DEFAULT_BROADCAST_LON),
            },
            broadcast_interval: Duration::from_secs(
                var("BROADCAST_INTERVAL_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .expect("BROADCAST_INTERVAL_SECS must be a whole number of seconds"),
            ),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        }
    }
}
