use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known path serving an agent's capability descriptor.
pub const WELL_KNOWN_CARD_PATH: &str = "/.well-known/agent.json";

/// One schema-typed operation advertised on an agent card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCard {
    pub id: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// Static descriptor advertising an agent's name, base URL, version and
/// skills. Served at [`WELL_KNOWN_CARD_PATH`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub url: String,
    pub version: String,
    pub skills: Vec<SkillCard>,
}

impl AgentCard {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            skills: Vec::new(),
        }
    }

    pub fn with_skill(
        mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        output_schema: Value,
    ) -> Self {
        self.skills.push(SkillCard {
            id: id.into(),
            description: description.into(),
            input_schema,
            output_schema,
        });
        self
    }

    pub fn has_skill(&self, id: &str) -> bool {
        self.skills.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_accumulates_skills() {
        let card = AgentCard::new("planner", "http://127.0.0.1:9001")
            .with_skill("plan", "Produce a plan", json!({"type": "object"}), json!({"type": "object"}))
            .with_skill("reflect", "Judge a result", json!({"type": "object"}), json!({"type": "object"}));
        assert!(card.has_skill("plan"));
        assert!(card.has_skill("reflect"));
        assert!(!card.has_skill("chat"));
        assert_eq!(card.version, env!("CARGO_PKG_VERSION"));
    }
}
