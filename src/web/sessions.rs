use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::state::AppState;

/// `POST /api/sessions`: allocate an empty session.
pub async fn create_session(State(state): State<AppState>) -> Json<Value> {
    let session_id = state.orchestrator.sessions().create().await;
    Json(json!({"session_id": session_id}))
}

/// `GET /api/sessions/{id}/history`.
///
/// An unknown (or deleted) session reads as an empty history, so delete
/// followed by a history fetch round-trips cleanly.
pub async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    let history = state.orchestrator.sessions().history(&id).await.unwrap_or_default();
    Json(json!({"session_id": id, "history": history}))
}

/// `DELETE /api/sessions/{id}`.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    state.orchestrator.sessions().remove(&id).await;
    Json(json!({"success": true}))
}
