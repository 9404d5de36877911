use axum::{
    extract::{Query, State},
    response::{sse::Event, Json, Sse},
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    board_id: Option<String>,
}

/// SSE endpoint: streams TaskChangeEvent as JSON to connected clients,
/// optionally limited to one board.
pub async fn sse_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();
    let board_id = query.board_id;
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) => {
            if board_id.as_deref().is_some_and(|id| id != event.board_id()) {
                return None;
            }
            let json = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(json)))
        }
        Err(e) => {
            log::warn!(target: "sprintboard.api.events", "SSE subscriber lagged: {}", e);
            None
        }
    });

    // Keep-alive every 30 seconds
    let stream = stream.merge(tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(
            std::time::Duration::from_secs(30),
        )),
        |_| Ok(Event::default().comment("keep-alive")),
    ));

    Sse::new(stream)
}

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "port": state.port,
        "bind_address": state.bind_address,
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "subscribers": state.event_tx.receiver_count(),
    }))
}
