use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::state::AppState;
use crate::domain::ChatRequest;
use crate::events::WILDCARD;

/// `POST /api/chat/stream`: the same chat contract, delivered as a
/// server-sent event stream.
///
/// Events: `agent_event` (one per observability event of this request),
/// then `result` with the final chat response, or `error` on failure.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(mut request): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message is required"})),
        ));
    }

    // Allocate the request id here so the event subscription is in place
    // before the first event fires.
    let request_id = Uuid::new_v4().to_string();
    request.request_id = Some(request_id.clone());

    let mut events = state.orchestrator.events().subscribe(WILDCARD).await;
    let (result_tx, result_rx) = oneshot::channel();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let response = orchestrator.chat(request).await;
        let _ = result_tx.send(response);
    });

    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(async_stream::stream! {
            let mut result_rx = result_rx;
            loop {
                tokio::select! {
                    maybe_event = events.recv() => {
                        match maybe_event {
                            Some(event) if event.request_id == request_id => {
                                yield Ok(sse_event("agent_event", &event));
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    result = &mut result_rx => {
                        // The request is done. Drain events already queued
                        // (request_end included) before the final payload.
                        while let Ok(event) = events.try_recv() {
                            if event.request_id == request_id {
                                yield Ok(sse_event("agent_event", &event));
                            }
                        }
                        match result {
                            Ok(response) => yield Ok(sse_event("result", &response)),
                            Err(_) => yield Ok(Event::default()
                                .event("error")
                                .data(json!({"error": "chat task dropped"}).to_string())),
                        }
                        break;
                    }
                }
            }
        });

    let sse = Sse::new(stream).keep_alive(KeepAlive::default());
    // Keep intermediaries from buffering the stream.
    Ok((
        [
            ("cache-control", "no-cache"),
            ("x-accel-buffering", "no"),
        ],
        sse,
    ))
}

fn sse_event<T: serde::Serialize>(kind: &str, payload: &T) -> Event {
    Event::default()
        .event(kind)
        .data(serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()))
}
