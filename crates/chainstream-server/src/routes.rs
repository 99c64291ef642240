//! HTTP routes.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::Stream;
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use chainstream_core::StreamDirectory;

use crate::bridge::Frame;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_default))
        .route("/sse/:stream", get(sse_stream))
        .route("/streams", get(list_streams))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /sse/:stream — tail one logical stream.
async fn sse_stream(
    State(state): State<AppState>,
    Path(stream): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    tail(state, &stream).await
}

/// GET /sse — tail the default stream.
async fn sse_default(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    tail(state, StreamDirectory::DEFAULT_STREAM).await
}

async fn tail(
    state: AppState,
    stream: &str,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let relay = state.bridge.open(stream).await?;

    // The relay notices the receiver being dropped with the response body.
    let (tx, rx) = mpsc::channel::<Frame>(state.channel_capacity);
    tokio::spawn(relay.run(tx));

    let named = state.named_events;
    let events = ReceiverStream::new(rx).map(move |frame| Ok(frame_event(&frame, named)));
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// `id: <sequence>` and `data: <payload json>`, delivered as a default
/// `message` event unless `named` tags it with the subject.
pub(crate) fn frame_event(frame: &Frame, named: bool) -> Event {
    let event = if named {
        Event::default().event(frame.subject.as_str())
    } else {
        Event::default()
    };
    event
        .id(frame.sequence.to_string())
        .data(String::from_utf8_lossy(&frame.data))
}

/// GET /streams — the stream directory.
async fn list_streams(State(state): State<AppState>) -> Json<Value> {
    let directory = state.bridge.directory();
    let mut streams = Map::new();
    for entry in directory.entries() {
        streams.insert(entry.name().to_string(), Value::String(entry.summary()));
    }

    let default_name = StreamDirectory::DEFAULT_STREAM;
    let unknown = if state.bridge.is_strict() {
        "unknown stream names are rejected with 404".to_string()
    } else {
        format!("unknown stream names fall back to {default_name}")
    };

    Json(json!({
        "streams": streams,
        "usage": {
            "sse": "/sse/:stream (e.g., /sse/pending)",
            "all_sse": format!("/sse (subscribes to {})", directory.default_subject()),
            "unknown": unknown,
        },
        "retention": {
            "maxAgeSecs": state.retention.max_age.as_secs(),
            "maxMessages": state.retention.max_messages,
        },
    }))
}

/// GET /health — liveness only.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chainstream_core::Subject;

    fn frame() -> Frame {
        Frame {
            subject: Subject::logs(),
            sequence: 42,
            data: Bytes::from_static(br#"{"count":1}"#),
        }
    }

    #[test]
    fn frames_are_unnamed_by_default() {
        let rendered = format!("{:?}", frame_event(&frame(), false));
        assert!(rendered.contains("42"));
        assert!(!rendered.contains("eth.logs"));
    }

    #[test]
    fn named_frames_carry_the_subject() {
        let rendered = format!("{:?}", frame_event(&frame(), true));
        assert!(rendered.contains("eth.logs"));
    }
}
