use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::json::{non_empty_str, string_or_default};

/// One tool invocation inside a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: String,
    /// Always a JSON object; enforced by the validation layer.
    pub args: Value,
    #[serde(default)]
    pub description: String,
}

/// Validated planner output.
///
/// Invariant: every `steps[].tool` is contained in the tool catalog the
/// planner was given. A plan with no steps either asks for clarification or
/// means there is nothing to do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
    #[serde(default)]
    pub missing_locations: Vec<String>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Build a plan from raw model JSON, applying the validation layer:
    /// steps referencing unknown tools or non-object args are dropped with a
    /// warning, and `missing_locations` is normalized to non-empty trimmed
    /// strings. Unknown extra fields are ignored.
    pub fn from_model_json(value: &Value, allowed_tools: &HashSet<String>) -> Self {
        let steps = filter_steps(value.get("steps"), allowed_tools, "plan");
        Self {
            reasoning: string_or_default(value, "reasoning"),
            needs_clarification: value
                .get("needs_clarification")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            clarification_question: non_empty_str(value, "clarification_question"),
            missing_locations: normalize_locations(value.get("missing_locations")),
            steps,
        }
    }
}

/// Shared step filter for plans and reflections.
pub(crate) fn filter_steps(
    raw: Option<&Value>,
    allowed_tools: &HashSet<String>,
    source: &str,
) -> Vec<PlanStep> {
    let Some(Value::Array(raw_steps)) = raw else {
        return Vec::new();
    };

    let mut steps = Vec::with_capacity(raw_steps.len());
    for raw_step in raw_steps {
        let Some(tool) = non_empty_str(raw_step, "tool") else {
            warn!(source, "dropping step without a tool name");
            continue;
        };
        if !allowed_tools.contains(&tool) {
            warn!(source, tool, "dropping step: tool not in catalog");
            continue;
        }
        let args = raw_step.get("args").cloned().unwrap_or(Value::Null);
        if !args.is_object() {
            warn!(source, tool, "dropping step: args is not an object");
            continue;
        }
        steps.push(PlanStep {
            tool,
            args,
            description: string_or_default(raw_step, "description"),
        });
    }
    steps
}

fn normalize_locations(raw: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_only_steps_with_known_tools_and_object_args() {
        let raw = json!({
            "reasoning": "take off first",
            "needs_clarification": false,
            "steps": [
                {"tool": "drone.take_off", "args": {"altitude": 1.5}, "description": "up"},
                {"tool": "drone.self_destruct", "args": {}},
                {"tool": "drone.move_to", "args": "not an object"},
                {"args": {"x": 1.0}}
            ]
        });
        let plan = Plan::from_model_json(&raw, &catalog(&["drone.take_off", "drone.move_to"]));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, "drone.take_off");
        assert_eq!(plan.steps[0].args["altitude"], 1.5);
    }

    #[test]
    fn normalizes_missing_locations() {
        let raw = json!({
            "needs_clarification": true,
            "clarification_question": "which point?",
            "missing_locations": ["  3号 ", "", "6号", 42]
        });
        let plan = Plan::from_model_json(&raw, &catalog(&[]));
        assert!(plan.needs_clarification);
        assert_eq!(plan.missing_locations, vec!["3号", "6号"]);
        assert_eq!(plan.clarification_question.as_deref(), Some("which point?"));
    }

    #[test]
    fn tolerates_unknown_fields_and_missing_steps() {
        let raw = json!({"reasoning": "noop", "certainty": 0.4});
        let plan = Plan::from_model_json(&raw, &catalog(&["drone.take_off"]));
        assert!(plan.steps.is_empty());
        assert!(!plan.needs_clarification);
    }
}
