//! Live stream list over WebSocket.
//!
//! Each client gets its own repository subscription. Snapshots pass through a
//! `watch` channel, so a slow client skips straight to the newest list instead
//! of queueing stale ones.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

use livecast_models::{Stream, StreamId};

use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Configuration for WebSocket backpressure.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const ENDPOINT: &str = "streams";

/// Server-to-client message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full stream list, newest first.
    Snapshot {
        streams: Vec<Stream>,
        #[serde(rename = "activeStreamId")]
        active_stream_id: Option<StreamId>,
    },
    /// The subscription failed; the server closes the socket after this.
    Error { message: String },
}

impl WsMessage {
    pub fn snapshot(streams: Vec<Stream>) -> Self {
        let active_stream_id = streams.iter().find(|s| s.is_active).and_then(|s| s.id.clone());
        WsMessage::Snapshot {
            streams,
            active_stream_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WsMessage::Snapshot { .. } => "snapshot",
            WsMessage::Error { .. } => "error",
        }
    }
}

/// Latest subscription output for one client.
#[derive(Debug, Clone)]
enum Feed {
    Pending,
    Snapshot(Vec<Stream>),
    Failed(String),
}

/// Send a WebSocket message with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: &WsMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    match tx.try_send(Message::Text(json)) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(msg)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(msg).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// WebSocket endpoint pushing the stream list on every change.
pub async fn ws_streams(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(ENDPOINT);

    ws.on_upgrade(|socket| async move {
        handle_streams_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_streams_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();

    // Bounded channel for backpressure
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let (feed_tx, mut feed_rx) = watch::channel(Feed::Pending);
    let feed_tx = Arc::new(feed_tx);
    let err_tx = Arc::clone(&feed_tx);
    let subscription = state.streams.subscribe(
        move |streams| {
            feed_tx.send_replace(Feed::Snapshot(streams));
        },
        move |e| {
            err_tx.send_replace(Feed::Failed(e.to_string()));
        },
    );

    info!("WebSocket stream client connected");

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            changed = feed_rx.changed() => {
                if changed.is_err() {
                    debug!("Stream feed closed");
                    break;
                }
                let msg = match &*feed_rx.borrow_and_update() {
                    Feed::Pending => continue,
                    Feed::Snapshot(streams) => WsMessage::snapshot(streams.clone()),
                    Feed::Failed(message) => WsMessage::Error { message: message.clone() },
                };

                metrics::record_ws_message_sent(ENDPOINT, msg.kind());
                if !send_ws_message(&tx, &msg).await {
                    warn!("WebSocket send failed, client disconnected");
                    break;
                }
                last_activity = Instant::now();

                if matches!(msg, WsMessage::Error { .. }) {
                    break;
                }
            }
            // Heartbeat to keep connection alive
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                    && tx.send(Message::Ping(vec![])).await.is_err()
                {
                    warn!("Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                    Some(Ok(_)) => {
                        metrics::record_ws_message_received(ENDPOINT);
                    }
                }
            }
        }
    }

    subscription.unsubscribe();
    drop(tx);
    let _ = send_task.await;
    info!("WebSocket stream client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream(id: &str, is_active: bool) -> Stream {
        Stream {
            id: Some(StreamId::from(id)),
            video_id: "dQw4w9WgXcQ".into(),
            title: id.into(),
            description: String::new(),
            is_active,
            created_at: 0,
            updated_at: None,
            thumbnail: None,
        }
    }

    #[test]
    fn test_snapshot_picks_first_active() {
        let msg = WsMessage::snapshot(vec![stream("a", false), stream("b", true), stream("c", true)]);
        match &msg {
            WsMessage::Snapshot { active_stream_id, .. } => {
                assert_eq!(active_stream_id.as_ref().map(|id| id.as_str()), Some("b"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["activeStreamId"], "b");
        assert_eq!(value["streams"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_error_message_shape() {
        let msg = WsMessage::Error {
            message: "Database not initialized".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "error", "message": "Database not initialized"})
        );
    }

    #[test]
    fn test_empty_snapshot_has_null_active() {
        let value = serde_json::to_value(WsMessage::snapshot(Vec::new())).unwrap();
        assert_eq!(value["activeStreamId"], serde_json::Value::Null);
    }
}
