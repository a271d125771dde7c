use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::json::string_or_default;
use super::plan::{filter_steps, PlanStep};

/// Post-execution verdict produced by the planner.
///
/// Invariants: `confidence` is clamped to `[0, 1]`; when `goal_achieved` is
/// true `next_steps` is empty; every `next_steps[].tool` is in the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reflection {
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub goal_achieved: bool,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub next_steps: Vec<PlanStep>,
    #[serde(default)]
    pub summary: String,
}

impl Reflection {
    /// Confidence floor for accepting a `goal_achieved` verdict.
    pub const CONFIDENCE_EXIT: f32 = 0.8;

    pub fn from_model_json(value: &Value, allowed_tools: &HashSet<String>) -> Self {
        let goal_achieved = value
            .get("goal_achieved")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mut next_steps = filter_steps(value.get("next_steps"), allowed_tools, "reflection");
        if goal_achieved && !next_steps.is_empty() {
            warn!(
                count = next_steps.len(),
                "reflection claims the goal is achieved but proposes next steps; clearing them"
            );
            next_steps.clear();
        }

        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0) as f32;

        Self {
            observation: string_or_default(value, "observation"),
            reasoning: string_or_default(value, "reasoning"),
            goal_achieved,
            confidence: confidence.clamp(0.0, 1.0),
            next_steps,
            summary: string_or_default(value, "summary"),
        }
    }

    /// True when the ReAct loop may terminate on this verdict.
    pub fn accepts_goal(&self) -> bool {
        self.goal_achieved && self.confidence >= Self::CONFIDENCE_EXIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clamps_confidence() {
        let raw = json!({"goal_achieved": true, "confidence": 1.7, "summary": "done"});
        let reflection = Reflection::from_model_json(&raw, &catalog(&[]));
        assert_eq!(reflection.confidence, 1.0);

        let raw = json!({"confidence": -0.3});
        let reflection = Reflection::from_model_json(&raw, &catalog(&[]));
        assert_eq!(reflection.confidence, 0.0);
    }

    #[test]
    fn clears_next_steps_when_goal_achieved() {
        let raw = json!({
            "goal_achieved": true,
            "confidence": 0.95,
            "next_steps": [{"tool": "drone.land", "args": {}}]
        });
        let reflection = Reflection::from_model_json(&raw, &catalog(&["drone.land"]));
        assert!(reflection.next_steps.is_empty());
        assert!(reflection.accepts_goal());
    }

    #[test]
    fn filters_next_steps_against_catalog() {
        let raw = json!({
            "goal_achieved": false,
            "confidence": 0.4,
            "next_steps": [
                {"tool": "drone.land", "args": {}},
                {"tool": "made.up", "args": {}}
            ]
        });
        let reflection = Reflection::from_model_json(&raw, &catalog(&["drone.land"]));
        assert_eq!(reflection.next_steps.len(), 1);
        assert!(!reflection.accepts_goal());
    }

    #[test]
    fn low_confidence_goal_is_not_accepted() {
        let raw = json!({"goal_achieved": true, "confidence": 0.5});
        let reflection = Reflection::from_model_json(&raw, &catalog(&[]));
        assert!(!reflection.accepts_goal());
    }
}
