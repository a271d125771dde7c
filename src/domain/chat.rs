use serde::{Deserialize, Serialize};

use super::execution::StepResult;
use super::plan::Plan;
use super::reflection::Reflection;
use super::retrieval::{RetrievalFilters, RetrievalHit};

/// Input to the orchestrator's `chat` skill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RetrievalFilters>,
    /// Pre-allocated request id, set by the streaming endpoint so it can
    /// subscribe to the event stream before the request starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Full answer for one chat request. Failed requests are still well-formed:
/// `success = false` plus an `error` string, never a bare transport error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub request_id: String,
    pub answer: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tool_calls: Vec<StepResult>,
    #[serde(default)]
    pub rag_hits: Vec<RetrievalHit>,
    #[serde(default)]
    pub execution_success: bool,
    #[serde(default)]
    pub goal_achieved: bool,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub react_iterations: usize,
    #[serde(default)]
    pub rag_retries: usize,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrips_without_optional_fields() {
        let parsed: ChatRequest =
            serde_json::from_str(r#"{"message": "take off to 1.5m"}"#).unwrap();
        assert_eq!(parsed.message, "take off to 1.5m");
        assert!(parsed.session_id.is_none());

        let out = serde_json::to_value(&parsed).unwrap();
        assert!(out.get("session_id").is_none());
        assert!(out.get("request_id").is_none());
    }
}
