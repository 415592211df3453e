//! Background broadcaster for real-time subscribers.
//!
//! Fetches and normalizes one configured location on a fixed period and
//! publishes the snapshot on a broadcast channel that every WebSocket
//! subscriber listens to.
//!
//! Lifecycle:
//! - Idle until the first subscriber connects; `ensure_started` flips an
//!   atomic flag so only one timer task is ever spawned
//! - Running for the rest of the process, with or without subscribers
//! - A failed or panicking tick is logged and skipped; the next tick runs on
//!   schedule
//! - Broadcast snapshots are never written to the store

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use utoipa::ToSchema;

use crate::services::pipeline::panic_message;
use crate::services::snapshot::{normalize, Coordinates, EnvironmentSnapshot};
use crate::services::upstream::EnvironmentSource;

/// Event name carried by every real-time update.
pub const UPDATE_EVENT: &str = "air_quality_update";

/// Snapshots buffered per subscriber before a slow reader starts skipping.
const CHANNEL_CAPACITY: usize = 16;

/// Shortest accepted tick period.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Scheduler state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BroadcastStatus {
    /// Whether the timer task has been started
    pub active: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub interval_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
    /// "pending", "published", or "error"
    pub last_tick_result: String,
    pub total_ticks: u64,
    pub failed_ticks: u64,
    /// Currently connected subscribers
    pub subscribers: usize,
}

pub struct BroadcastScheduler {
    source: Arc<dyn EnvironmentSource>,
    location: Coordinates,
    period: Duration,
    started: AtomicBool,
    sender: broadcast::Sender<EnvironmentSnapshot>,
    status: RwLock<BroadcastStatus>,
}

impl BroadcastScheduler {
    pub fn new(
        source: Arc<dyn EnvironmentSource>,
        location: Coordinates,
        period: Duration,
    ) -> Arc<Self> {
        let period = period.max(MIN_PERIOD);
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        Arc::new(Self {
            source,
            location,
            period,
            started: AtomicBool::new(false),
            sender,
            status: RwLock::new(BroadcastStatus {
                active: false,
                latitude: location.latitude,
                longitude: location.longitude,
                interval_secs: period.as_secs(),
                started_at: None,
                last_tick_at: None,
                last_tick_result: "pending".to_string(),
                total_ticks: 0,
                failed_ticks: 0,
                subscribers: 0,
            }),
        })
    }

    /// Register a new subscriber. Only snapshots published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentSnapshot> {
        self.sender.subscribe()
    }

    /// Start the timer task unless it is already running.
    ///
    /// Returns `true` only for the call that actually started it.
    pub fn ensure_started(self: &Arc<Self>) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        tokio::spawn(Arc::clone(self).run());
        true
    }

    pub async fn status(&self) -> BroadcastStatus {
        let mut status = self.status.read().await.clone();
        status.active = self.started.load(Ordering::Acquire);
        status.subscribers = self.sender.receiver_count();
        status
    }

    /// Tick loop. Never returns; the first tick fires one period after start.
    async fn run(self: Arc<Self>) {
        tracing::info!(
            "Broadcast scheduler started for ({}, {}) every {}s",
            self.location.latitude,
            self.location.longitude,
            self.period.as_secs()
        );
        self.status.write().await.started_at = Some(Utc::now());

        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let outcome = AssertUnwindSafe(self.source.fetch(self.location))
            .catch_unwind()
            .await;

        let published = match outcome {
            Ok(Ok(raw)) => {
                self.publish(normalize(self.location, &raw, Utc::now()));
                true
            }
            Ok(Err(e)) => {
                tracing::warn!("Broadcast tick skipped: {}", e);
                false
            }
            Err(panic) => {
                tracing::error!("Broadcast tick panicked: {}", panic_message(&*panic));
                false
            }
        };

        let mut status = self.status.write().await;
        status.last_tick_at = Some(Utc::now());
        status.total_ticks += 1;
        if published {
            status.last_tick_result = "published".to_string();
        } else {
            status.failed_ticks += 1;
            status.last_tick_result = "error".to_string();
        }
    }

    fn publish(&self, snapshot: EnvironmentSnapshot) {
        match self.sender.send(snapshot) {
            Ok(receivers) => {
                tracing::info!("Emitted {} to {} subscribers", UPDATE_EVENT, receivers);
            }
            Err(_) => {
                tracing::debug!("No subscribers connected, dropping {}", UPDATE_EVENT);
            }
        }
    }
}
