//! Seams between the snapshot pipeline and the upstream providers.
//!
//! The request handler and the broadcast scheduler hold these as trait
//! objects, so either side can be swapped for an in-process stand-in.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::services::openweather::RawEnvironment;
use crate::services::snapshot::Coordinates;

/// Resolves a free-text place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns `None` both when the place is unknown and when the provider
    /// could not be reached.
    async fn resolve(&self, location_name: &str) -> Option<Coordinates>;
}

/// Fetches raw pollution and weather payloads for a coordinate pair.
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    /// Fails with `AppError::UpstreamUnavailable` unless both payloads were
    /// fetched and parsed.
    async fn fetch(&self, coords: Coordinates) -> Result<RawEnvironment, AppError>;
}
