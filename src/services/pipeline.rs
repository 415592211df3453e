//! Request-scoped snapshot pipeline.
//!
//! resolve location -> fetch upstream payloads -> normalize -> persist -> respond.
//! Persistence is best effort; every other step can end the request with an
//! `AppError`. A panic inside the pipeline is caught here and reported as
//! `AppError::InternalError` instead of reaching the transport layer.

use chrono::Utc;
use futures::FutureExt;
use serde::Deserialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::db::store::SnapshotStore;
use crate::errors::AppError;
use crate::services::snapshot::{normalize, Coordinates, EnvironmentSnapshot};
use crate::services::upstream::{EnvironmentSource, Geocoder};

/// Body of `POST /api/air_quality`. A place name takes precedence over coordinates.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AirQualityRequest {
    /// Free-text place name, e.g. "New Delhi"
    pub location: Option<String>,
    /// Latitude in decimal degrees
    pub lat: Option<f64>,
    /// Longitude in decimal degrees
    pub lon: Option<f64>,
}

/// Orchestrates one snapshot request.
#[derive(Clone)]
pub struct SnapshotService {
    geocoder: Arc<dyn Geocoder>,
    source: Arc<dyn EnvironmentSource>,
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        source: Arc<dyn EnvironmentSource>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            geocoder,
            source,
            store,
        }
    }

    pub async fn handle(&self, request: AirQualityRequest) -> Result<EnvironmentSnapshot, AppError> {
        match AssertUnwindSafe(self.run(request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(AppError::InternalError(format!(
                "snapshot pipeline panicked: {}",
                panic_message(&*panic)
            ))),
        }
    }

    async fn run(&self, request: AirQualityRequest) -> Result<EnvironmentSnapshot, AppError> {
        let coords = self.resolve_coordinates(&request).await?;

        let raw = self.source.fetch(coords).await?;
        let snapshot = normalize(coords, &raw, Utc::now());

        // Best effort: the store logs its own failures.
        self.store.append(&snapshot).await;

        tracing::info!(
            "Served snapshot for {} ({}, {}), aqi={}",
            snapshot.location.city,
            coords.latitude,
            coords.longitude,
            snapshot.air_quality.aqi
        );

        Ok(snapshot)
    }

    async fn resolve_coordinates(&self, request: &AirQualityRequest) -> Result<Coordinates, AppError> {
        let location = request.location.as_deref().filter(|name| !name.is_empty());

        if let Some(name) = location {
            return self
                .geocoder
                .resolve(name)
                .await
                .ok_or(AppError::InvalidLocation);
        }

        match (request.lat, request.lon) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Ok(Coordinates {
                    latitude,
                    longitude,
                })
            }
            _ => Err(AppError::MissingInput),
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
