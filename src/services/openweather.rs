//! OpenWeatherMap client.
//!
//! Covers the three endpoints the service depends on:
//! - Direct geocoding: https://openweathermap.org/api/geocoding-api
//! - Air pollution: https://openweathermap.org/api/air-pollution
//! - Current weather: https://openweathermap.org/current

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AppError;
use crate::services::snapshot::Coordinates;
use crate::services::upstream::{EnvironmentSource, Geocoder};

const GEOCODE_PATH: &str = "/geo/1.0/direct";
const AIR_POLLUTION_PATH: &str = "/data/2.5/air_pollution";
const WEATHER_PATH: &str = "/data/2.5/weather";

/// Client for the OpenWeatherMap geocoding, air pollution and weather APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Pollution entry and current weather for one coordinate pair, as returned
/// by the upstream APIs.
#[derive(Debug, Clone)]
pub struct RawEnvironment {
    pub pollution: PollutionEntry,
    pub weather: WeatherPayload,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollutionResponse {
    #[serde(default)]
    pub list: Vec<PollutionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollutionEntry {
    pub main: PollutionIndex,
    #[serde(default)]
    pub components: PollutantComponents,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollutionIndex {
    pub aqi: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollutantComponents {
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub o3: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherPayload {
    pub main: WeatherMain,
    pub wind: WeatherWind,
    pub visibility: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherWind {
    pub speed: f64,
}

/// Pair the first pollution entry with the weather payload.
///
/// The pollution API is expected to return at least one entry; an empty list
/// is reported as an upstream failure.
pub fn parse_environment(
    pollution: PollutionResponse,
    weather: WeatherPayload,
) -> Result<RawEnvironment, AppError> {
    let pollution = pollution.list.into_iter().next().ok_or_else(|| {
        AppError::UpstreamUnavailable("air pollution API returned an empty list".to_string())
    })?;

    Ok(RawEnvironment { pollution, weather })
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// GET `path` with the API key appended and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("{} request failed: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("{} JSON parse error: {}", path, e)))
    }

    fn coordinate_query(coords: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
        ]
    }
}

#[async_trait]
impl Geocoder for OpenWeatherClient {
    async fn resolve(&self, location_name: &str) -> Option<Coordinates> {
        let query = [
            ("q", location_name.to_string()),
            ("limit", "1".to_string()),
        ];

        match self
            .get_json::<Vec<GeocodeCandidate>>(GEOCODE_PATH, &query)
            .await
        {
            Ok(candidates) => {
                let first = candidates.into_iter().next();
                if first.is_none() {
                    tracing::info!("Geocoding found no match for '{}'", location_name);
                }
                first.map(|c| Coordinates {
                    latitude: c.lat,
                    longitude: c.lon,
                })
            }
            Err(e) => {
                tracing::warn!("Geocoding '{}' failed: {}", location_name, e);
                None
            }
        }
    }
}

#[async_trait]
impl EnvironmentSource for OpenWeatherClient {
    async fn fetch(&self, coords: Coordinates) -> Result<RawEnvironment, AppError> {
        let pollution_query = Self::coordinate_query(coords);
        let mut weather_query = Self::coordinate_query(coords);
        weather_query.push(("units", "metric".to_string()));

        // The two calls are independent; either failing fails the fetch.
        let (pollution, weather) = futures::try_join!(
            self.get_json::<PollutionResponse>(AIR_POLLUTION_PATH, &pollution_query),
            self.get_json::<WeatherPayload>(WEATHER_PATH, &weather_query),
        )?;

        parse_environment(pollution, weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::snapshot::normalize;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DELHI: Coordinates = Coordinates {
        latitude: 28.6139,
        longitude: 77.2090,
    };

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    fn pollution_body() -> serde_json::Value {
        json!({
            "coord": { "lon": 77.209, "lat": 28.6139 },
            "list": [{
                "dt": 1760779800,
                "main": { "aqi": 3 },
                "components": {
                    "co": 0.3, "no": 0.1, "no2": 10, "o3": 40,
                    "so2": 5, "pm2_5": 12.3, "pm10": 20.1, "nh3": 2.0
                }
            }]
        })
    }

    fn weather_body() -> serde_json::Value {
        json!({
            "main": { "temp": 25, "feels_like": 25.4, "humidity": 60, "pressure": 1012 },
            "wind": { "speed": 3.1, "deg": 270 },
            "visibility": 8000,
            "name": "New Delhi"
        })
    }

    async fn mount_environment(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(AIR_POLLUTION_PATH))
            .and(query_param("lat", "28.6139"))
            .and(query_param("lon", "77.209"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pollution_body()))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_takes_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GEOCODE_PATH))
            .and(query_param("q", "São Paulo, BR"))
            .and(query_param("limit", "1"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "São Paulo", "lat": -23.5506507, "lon": -46.6333824, "country": "BR" },
                { "name": "São Paulo", "lat": -22.0, "lon": -48.0, "country": "BR" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let coords = client_for(&server).resolve("São Paulo, BR").await.unwrap();
        assert_eq!(coords.latitude, -23.5506507);
        assert_eq!(coords.longitude, -46.6333824);
    }

    #[tokio::test]
    async fn test_resolve_empty_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GEOCODE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(client_for(&server).resolve("Nonexistent Place").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_upstream_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GEOCODE_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "cod": 401 })))
            .mount(&server)
            .await;

        assert!(client_for(&server).resolve("Zurich").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_malformed_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GEOCODE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(client_for(&server).resolve("Zurich").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_new_delhi_end_to_end() {
        let server = MockServer::start().await;
        mount_environment(&server).await;

        let raw = client_for(&server).fetch(DELHI).await.unwrap();
        let now = "2026-10-18T09:30:00Z".parse().unwrap();
        let snapshot = normalize(DELHI, &raw, now);

        assert_eq!(snapshot.air_quality.pm25, 12.3);
        assert_eq!(snapshot.air_quality.pm10, 20.1);
        assert_eq!(snapshot.air_quality.aqi, 3);
        assert_eq!(snapshot.weather.temperature, 25.0);
        assert_eq!(snapshot.weather.humidity, 60);
        assert_eq!(snapshot.weather.visibility, 8000.0);
        assert_eq!(snapshot.weather.wind_speed, 3.1);
        assert_eq!(snapshot.weather.pressure, 1012.0);
        assert_eq!(snapshot.location.city, "New Delhi");
    }

    #[tokio::test]
    async fn test_fetch_empty_pollution_list_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(AIR_POLLUTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch(DELHI).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_weather_error_fails_whole_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(AIR_POLLUTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(pollution_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch(DELHI).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_weather_missing_main_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(AIR_POLLUTION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(pollution_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "cod": "400", "message": "wrong latitude" })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).fetch(DELHI).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_times_out_on_stalled_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(AIR_POLLUTION_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(pollution_body())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .mount(&server)
            .await;

        let client =
            OpenWeatherClient::new(&server.uri(), "test-key", Duration::from_millis(200)).unwrap();
        let result = client.fetch(DELHI).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[test]
    fn test_parse_environment_empty_list() {
        let pollution: PollutionResponse = serde_json::from_value(json!({})).unwrap();
        let weather: WeatherPayload = serde_json::from_value(weather_body()).unwrap();
        assert!(matches!(
            parse_environment(pollution, weather),
            Err(AppError::UpstreamUnavailable(_))
        ));
    }
}
