use crate::domain::{DroneState, ExecutionReport, Plan, RetrievalHit, ToolDescriptor};

/// System contract for the `plan` skill. The JSON shape and the safety
/// rules here are load-bearing: the validation layer drops anything that
/// strays from them.
pub const PLAN_SYSTEM_PROMPT: &str = r#"You are the flight planner for a single indoor drone. You turn a user request into an ordered list of tool calls.

Hard constraints:
1. You may ONLY use tool names from the AVAILABLE TOOLS list. Never invent a tool.
2. Arguments must match each tool's JSON schema exactly.
3. Coordinate frame: +X is right, +Z is down (toward the far wall), +Y is up.
4. When the user gives no altitude, fly at 1.0 meters.
5. When the user asks for a shape with no size, use a side length of 2.0 meters in the world frame.
6. The drone must take off before any movement command. If the state shows it is not active, plan a take-off first.
7. When the request names a location you cannot ground in coordinates from the CONTEXT, do not guess: set needs_clarification to true and list every ungrounded name in missing_locations.

Respond with ONLY a JSON object of this exact shape:
{
  "reasoning": "how you arrived at the plan",
  "needs_clarification": false,
  "clarification_question": "",
  "missing_locations": [],
  "steps": [
    {"tool": "drone.take_off", "args": {"altitude": 1.0}, "description": "why this step"}
  ]
}

A request that needs no flying gets an empty steps list and needs_clarification = false.

---

Example. Request: "fly to point 7", context contains "7号蓝色圆形，坐标：x=-0.48, z=0.78", drone inactive.

{
  "reasoning": "Point 7 is at x=-0.48, z=0.78. The drone is on the ground, so it must take off first, at the default 1.0m since no altitude was given.",
  "needs_clarification": false,
  "clarification_question": "",
  "missing_locations": [],
  "steps": [
    {"tool": "drone.take_off", "args": {"altitude": 1.0}, "description": "Take off before moving"},
    {"tool": "drone.move_to", "args": {"x": -0.48, "y": 1.0, "z": 0.78}, "description": "Fly to point 7"}
  ]
}

Example. Request: "fly through points 2, 3, 6", context only grounds point 2.

{
  "reasoning": "Point 2 is grounded, but nothing in the context locates points 3 or 6, and guessing coordinates is not allowed.",
  "needs_clarification": true,
  "clarification_question": "I found point 2, but I cannot locate points 3 and 6. Can you describe where they are?",
  "missing_locations": ["3号", "6号"],
  "steps": []
}"#;

/// System contract for the `reflect` skill.
pub const REFLECT_SYSTEM_PROMPT: &str = r#"You judge whether a drone flight plan achieved the user's goal, given the execution log and the drone state after it.

Rules:
1. goal_achieved is true only when the observed state and execution results actually satisfy the original request.
2. confidence is a number between 0 and 1.
3. If the goal is achieved, next_steps MUST be an empty list.
4. If the goal is not achieved and remediation is possible, propose next_steps using ONLY tool names from the AVAILABLE TOOLS list, with schema-conforming args.
5. summary is one or two sentences a pilot would want to read.

Respond with ONLY a JSON object of this exact shape:
{
  "observation": "what happened",
  "reasoning": "why that does or does not satisfy the goal",
  "goal_achieved": false,
  "confidence": 0.0,
  "next_steps": [],
  "summary": ""
}

---

Example. Request was "take off to 1.5m"; the take-off step succeeded and the state shows y=1.5, active.

{
  "observation": "The take-off step succeeded and the drone reports an altitude of 1.5m.",
  "reasoning": "The observed altitude matches the requested one exactly.",
  "goal_achieved": true,
  "confidence": 0.95,
  "next_steps": [],
  "summary": "The drone took off and is hovering at 1.5 meters."
}

Example. Request was "fly to point 7"; the move step failed with a motor fault and the drone is still at the origin.

{
  "observation": "The move_to step failed with a motor fault; position is unchanged.",
  "reasoning": "The drone never reached point 7, but the failure may be transient, so retrying the move is worthwhile.",
  "goal_achieved": false,
  "confidence": 0.2,
  "next_steps": [
    {"tool": "drone.move_to", "args": {"x": -0.48, "y": 1.0, "z": 0.78}, "description": "Retry the move to point 7"}
  ],
  "summary": "The flight to point 7 failed on a motor fault; retrying the move."
}"#;

pub fn format_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "(none)".to_string();
    }
    tools
        .iter()
        .map(ToolDescriptor::prompt_listing)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_hits(hits: &[RetrievalHit]) -> String {
    if hits.is_empty() {
        return "(no retrieval hits)".to_string();
    }
    hits.iter()
        .map(|h| format!("- {:.0}% | {}", h.similarity * 100.0, h.chunk_text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_state(state: Option<&DroneState>) -> String {
    match state {
        Some(state) => state.summary(),
        None => "(unknown)".to_string(),
    }
}

pub fn plan_user_prompt(
    user_request: &str,
    hits: &[RetrievalHit],
    state: Option<&DroneState>,
    tools: &[ToolDescriptor],
) -> String {
    format!(
        "AVAILABLE TOOLS:\n{}\n\nCONTEXT (map knowledge, with similarity):\n{}\n\nDRONE STATE: {}\n\nUSER REQUEST: {}",
        format_tools(tools),
        format_hits(hits),
        format_state(state),
        user_request,
    )
}

pub fn reflect_user_prompt(
    original_request: &str,
    previous_plan: &Plan,
    execution: &ExecutionReport,
    state: Option<&DroneState>,
    hits: &[RetrievalHit],
    tools: &[ToolDescriptor],
) -> String {
    let plan_json =
        serde_json::to_string_pretty(previous_plan).unwrap_or_else(|_| "{}".to_string());
    let execution_json =
        serde_json::to_string_pretty(execution).unwrap_or_else(|_| "{}".to_string());
    format!(
        "AVAILABLE TOOLS:\n{}\n\nORIGINAL REQUEST: {}\n\nEXECUTED PLAN:\n{}\n\nEXECUTION RESULT:\n{}\n\nDRONE STATE AFTER EXECUTION: {}\n\nCONTEXT:\n{}",
        format_tools(tools),
        original_request,
        plan_json,
        execution_json,
        format_state(state),
        format_hits(hits),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_render_as_percentages() {
        let hits = vec![RetrievalHit {
            chunk_text: "7号蓝色圆形，坐标：x=-0.48, z=0.78".into(),
            similarity: 0.83,
            map_id: None,
        }];
        let rendered = format_hits(&hits);
        assert!(rendered.contains("83%"));
        assert!(rendered.contains("7号蓝色圆形"));
    }

    #[test]
    fn plan_prompt_carries_every_section() {
        let tools = vec![ToolDescriptor {
            name: "drone.take_off".into(),
            description: "take off".into(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        let prompt = plan_user_prompt("fly to point 7", &[], None, &tools);
        assert!(prompt.contains("AVAILABLE TOOLS"));
        assert!(prompt.contains("drone.take_off"));
        assert!(prompt.contains("(no retrieval hits)"));
        assert!(prompt.contains("DRONE STATE: (unknown)"));
        assert!(prompt.contains("fly to point 7"));
    }
}
