use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage names used for paired `*_start` / `*_end` events.
pub mod phase {
    pub const REQUEST: &str = "request";
    pub const RAG: &str = "rag";
    pub const STATE: &str = "state";
    pub const TOOLS: &str = "tools";
    pub const PLAN: &str = "plan";
    pub const RAG_RETRY: &str = "rag_retry";
    pub const EXECUTE: &str = "execute";
    pub const OBSERVE: &str = "observe";
    pub const REFLECT: &str = "reflect";
}

/// One observability event. Append-only within a request; delivered to
/// subscribers in publish order for a given `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub agent: String,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl AgentEvent {
    pub fn new(
        event_type: impl Into<String>,
        request_id: impl Into<String>,
        agent: impl Into<String>,
        phase: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            request_id: request_id.into(),
            agent: agent.into(),
            phase: phase.into(),
            payload,
        }
    }

    /// `<phase>_start` event.
    pub fn start(request_id: &str, agent: &str, phase: &str, payload: Value) -> Self {
        Self::new(format!("{phase}_start"), request_id, agent, phase, payload)
    }

    /// `<phase>_end` event.
    pub fn end(request_id: &str, agent: &str, phase: &str, payload: Value) -> Self {
        Self::new(format!("{phase}_end"), request_id, agent, phase, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_and_end_derive_the_event_type() {
        let event = AgentEvent::start("r1", "orchestrator", phase::PLAN, json!({"iteration": 1}));
        assert_eq!(event.event_type, "plan_start");
        assert_eq!(event.phase, "plan");

        let event = AgentEvent::end("r1", "orchestrator", phase::PLAN, json!({"steps": 2}));
        assert_eq!(event.event_type, "plan_end");
    }

    #[test]
    fn serializes_type_field_name() {
        let event = AgentEvent::start("r1", "planner", phase::REFLECT, Value::Null);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "reflect_start");
        assert!(value.get("payload").is_none());
    }
}
