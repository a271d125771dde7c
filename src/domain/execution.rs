use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one executed plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub tool: String,
    pub args: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Step-by-step execution report returned by the executor's `execute` skill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: Vec<StepResult>,
    pub all_success: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub total_duration_ms: u64,
}

impl ExecutionReport {
    /// One-line summary used in answers and reflection prompts.
    pub fn summary(&self) -> String {
        if self.total_steps == 0 {
            return "no steps to execute".to_string();
        }
        if self.all_success {
            format!(
                "executed {} step(s) successfully in {} ms",
                self.total_steps, self.total_duration_ms
            )
        } else {
            let failed = self
                .results
                .iter()
                .find(|r| !r.success)
                .map(|r| r.tool.as_str())
                .unwrap_or("unknown");
            format!(
                "completed {}/{} step(s); `{}` failed",
                self.completed_steps, self.total_steps, failed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_names_the_failed_tool() {
        let report = ExecutionReport {
            results: vec![
                StepResult {
                    index: 0,
                    tool: "drone.take_off".into(),
                    args: json!({}),
                    success: true,
                    result: Some(json!({"ok": true})),
                    error: None,
                    duration_ms: 12,
                },
                StepResult {
                    index: 1,
                    tool: "drone.move_to".into(),
                    args: json!({}),
                    success: false,
                    result: None,
                    error: Some("motor fault".into()),
                    duration_ms: 3,
                },
            ],
            all_success: false,
            completed_steps: 1,
            total_steps: 2,
            total_duration_ms: 15,
        };
        assert_eq!(report.summary(), "completed 1/2 step(s); `drone.move_to` failed");
    }

    #[test]
    fn summary_for_empty_report() {
        assert_eq!(ExecutionReport::default().summary(), "no steps to execute");
    }
}
