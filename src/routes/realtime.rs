//! Real-time channel.
//!
//! GET /ws upgrades to a WebSocket. The first connection starts the broadcast
//! scheduler; every connection then receives one text frame per scheduler tick:
//! `{"event":"air_quality_update","data":<EnvironmentSnapshot>}`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::services::broadcast::{BroadcastScheduler, UPDATE_EVENT};
use crate::services::snapshot::EnvironmentSnapshot;

#[derive(Debug, Serialize)]
struct RealtimeEvent<'a> {
    event: &'static str,
    data: &'a EnvironmentSnapshot,
}

/// Serialize a snapshot into the update frame sent to subscribers.
fn encode_update(snapshot: &EnvironmentSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(&RealtimeEvent {
        event: UPDATE_EVENT,
        data: snapshot,
    })
}

pub(crate) async fn subscribe(
    ws: WebSocketUpgrade,
    State(scheduler): State<Arc<BroadcastScheduler>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, scheduler))
}

async fn handle_socket(socket: WebSocket, scheduler: Arc<BroadcastScheduler>) {
    tracing::info!("Client connected");

    // Subscribe before starting so the first tick cannot be missed.
    let mut updates = scheduler.subscribe();
    if scheduler.ensure_started() {
        tracing::info!("First subscriber connected, broadcast scheduler running");
    }

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    let frame = match encode_update(&snapshot) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!("Failed to encode {}: {}", UPDATE_EVENT, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }

    tracing::info!("Client disconnected");
}
