use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A capability discovered from the drone tool endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema for the tool's arguments, as advertised by the endpoint.
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    serde_json::json!({"type": "object"})
}

impl ToolDescriptor {
    /// Render one catalog entry the way planner prompts expect it.
    pub fn prompt_listing(&self) -> String {
        format!(
            "- {}: {}\n  schema: {}",
            self.name, self.description, self.input_schema
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_listing_contains_schema() {
        let tool = ToolDescriptor {
            name: "drone.take_off".into(),
            description: "Take off to an altitude".into(),
            input_schema: serde_json::json!({"type": "object", "properties": {"altitude": {"type": "number"}}}),
        };
        let listing = tool.prompt_listing();
        assert!(listing.contains("drone.take_off"));
        assert!(listing.contains("altitude"));
    }
}
