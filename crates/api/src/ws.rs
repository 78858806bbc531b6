//! WebSocket Transport
//!
//! Bridges the broadcaster's channel-backed subscriber to a live socket.
//! On connect the viewer receives a recent-history snapshot, then one
//! `data` message per ingested sample until it disconnects.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::AppState;
use broadcast::ChannelSubscriber;

/// Handle WebSocket upgrade
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle one viewer connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Seeding and registration are atomic with respect to ingestion, so a
    // sample arriving during attach is never lost between the two.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = state.gateway.subscribe(
        Box::new(ChannelSubscriber::new(tx)),
        state.config.snapshot_size,
    );
    info!(subscriber = %id, "viewer connected");

    loop {
        tokio::select! {
            push = rx.recv() => match push {
                Some(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            error!(subscriber = %id, "failed to serialize push: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                // Broadcaster already dropped this handle after a failed push.
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {} // viewers only listen; ignore stray frames
                Some(Err(e)) => {
                    error!(subscriber = %id, "websocket error: {}", e);
                    break;
                }
            },
        }
    }

    state.broadcaster.unsubscribe(id);
    info!(subscriber = %id, "viewer disconnected");
}
