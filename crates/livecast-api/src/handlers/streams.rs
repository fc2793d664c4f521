//! Public stream endpoints, served from the live view.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use livecast_firestore::LiveState;
use livecast_models::Stream;

use crate::state::AppState;

/// The active stream with the URLs a player needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStreamResponse {
    #[serde(flatten)]
    pub stream: Stream,
    pub embed_url: String,
    pub watch_url: String,
}

impl From<Stream> for ActiveStreamResponse {
    fn from(stream: Stream) -> Self {
        Self {
            embed_url: stream.embed_url(),
            watch_url: stream.watch_url(),
            stream,
        }
    }
}

/// All streams, newest first, with the view's load status.
pub async fn list_streams(State(state): State<AppState>) -> Json<LiveState> {
    Json(state.live.state())
}

/// The stream currently surfaced as live, or `null`.
pub async fn get_active_stream(State(state): State<AppState>) -> Json<Option<ActiveStreamResponse>> {
    Json(state.live.active_stream().map(ActiveStreamResponse::from))
}
