//! Broadcast scheduler status HTTP endpoint.
//!
//! GET /api/broadcast/status returns the current state of the real-time
//! broadcaster as JSON.

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::services::broadcast::{BroadcastScheduler, BroadcastStatus};

/// Get the current broadcast scheduler status.
///
/// Reports whether the timer has been started, tick counters, the outcome of
/// the last tick and the number of connected subscribers.
#[utoipa::path(
    get,
    path = "/api/broadcast/status",
    tag = "Broadcast",
    responses(
        (status = 200, description = "Current broadcast status", body = BroadcastStatus),
    )
)]
pub(crate) async fn get_broadcast_status(
    State(scheduler): State<Arc<BroadcastScheduler>>,
) -> Json<BroadcastStatus> {
    Json(scheduler.status().await)
}
