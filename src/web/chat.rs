use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::state::AppState;
use crate::domain::{ChatRequest, ChatResponse};

/// `POST /api/chat`: run one request through the orchestrator.
///
/// 400 only for missing required input; failures inside the loop come back
/// as 200 with `success = false` in the body.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<Value>)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message is required"})),
        ));
    }
    Ok(Json(state.orchestrator.chat(request).await))
}
