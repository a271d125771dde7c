use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single skill invocation travelling over the A2A transport.
///
/// Produced at dispatch, consumed once by the receiving agent, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub skill: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(skill: impl Into<String>, input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            skill: skill.into(),
            input,
            session_id: None,
            context: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Outcome of one task: either an `output` payload or an `error` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn ok(task_id: Uuid, output: Value, duration_ms: u64) -> Self {
        Self {
            task_id,
            success: true,
            output: Some(output),
            error: None,
            duration_ms,
            completed_at: Utc::now(),
        }
    }

    pub fn fail(task_id: Uuid, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id,
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms,
            completed_at: Utc::now(),
        }
    }

    /// Deserialize the output payload of a successful result.
    pub fn parse_output<T: serde::de::DeserializeOwned>(&self) -> Result<T, super::A2aError> {
        match (&self.output, &self.error) {
            (Some(output), _) => Ok(serde_json::from_value(output.clone())?),
            (None, Some(error)) => Err(super::A2aError::Handler(error.clone())),
            (None, None) => Err(super::A2aError::Handler("task produced no output".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_gets_unique_ids() {
        let a = Task::new("plan", json!({}));
        let b = Task::new("plan", json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn parse_output_surfaces_the_error() {
        let result = TaskResult::fail(Uuid::new_v4(), "UnknownSkill: nope", 3);
        let parsed: Result<serde_json::Value, _> = result.parse_output();
        assert!(parsed.unwrap_err().to_string().contains("UnknownSkill"));
    }
}
