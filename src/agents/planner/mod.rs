mod prompts;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{error, instrument};

use crate::a2a::{skill_handler, A2aError, A2aServer, AgentCard};
use crate::domain::{DroneState, ExecutionReport, Plan, Reflection, RetrievalHit, ToolDescriptor};
use crate::services::gemini::{GeminiClient, ModelError};

/// Strict-JSON calls run cold; the contract allows at most 0.3.
const PLAN_TEMPERATURE: f32 = 0.2;
const REFLECT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Deserialize)]
pub struct PlanInput {
    pub user_request: String,
    #[serde(default)]
    pub rag_hits: Vec<RetrievalHit>,
    #[serde(default)]
    pub drone_state: Option<DroneState>,
    #[serde(default)]
    pub available_tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Deserialize)]
pub struct ReflectInput {
    pub original_request: String,
    #[serde(default)]
    pub previous_plan: Plan,
    #[serde(default)]
    pub execution_result: ExecutionReport,
    #[serde(default)]
    pub current_drone_state: Option<DroneState>,
    #[serde(default)]
    pub rag_hits: Vec<RetrievalHit>,
    #[serde(default)]
    pub available_tools: Vec<ToolDescriptor>,
}

/// Planner agent: tool-schema-grounded plan generation and reflection.
pub struct PlannerAgent {
    gemini: GeminiClient,
}

impl PlannerAgent {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    /// Produce a validated plan for the request.
    ///
    /// An empty tool catalog never reaches the model: the planner refuses
    /// with a clarification so the orchestrator can apologize to the user.
    #[instrument(level = "info", skip_all, fields(tools = input.available_tools.len(), hits = input.rag_hits.len()))]
    pub async fn plan(&self, input: &PlanInput) -> Result<Plan, ModelError> {
        if input.available_tools.is_empty() {
            error!("NoToolsAvailable: refusing to plan without a tool catalog");
            return Ok(Plan {
                reasoning: "NoToolsAvailable: the executor reported an empty tool catalog".into(),
                needs_clarification: true,
                clarification_question: Some(
                    "I cannot control the drone right now because no tools are available. \
                     Please check that the drone endpoint is running."
                        .into(),
                ),
                missing_locations: Vec::new(),
                steps: Vec::new(),
            });
        }

        let prompt = prompts::plan_user_prompt(
            &input.user_request,
            &input.rag_hits,
            input.drone_state.as_ref(),
            &input.available_tools,
        );
        let raw = self
            .gemini
            .generate_json(prompts::PLAN_SYSTEM_PROMPT, &prompt, PLAN_TEMPERATURE)
            .await?;

        let allowed = allowed_names(&input.available_tools);
        Ok(Plan::from_model_json(&raw, &allowed))
    }

    /// Judge an execution outcome and optionally propose remedial steps.
    #[instrument(level = "info", skip_all)]
    pub async fn reflect(&self, input: &ReflectInput) -> Result<Reflection, ModelError> {
        let prompt = prompts::reflect_user_prompt(
            &input.original_request,
            &input.previous_plan,
            &input.execution_result,
            input.current_drone_state.as_ref(),
            &input.rag_hits,
            &input.available_tools,
        );
        let raw = self
            .gemini
            .generate_json(prompts::REFLECT_SYSTEM_PROMPT, &prompt, REFLECT_TEMPERATURE)
            .await?;

        let allowed = allowed_names(&input.available_tools);
        Ok(Reflection::from_model_json(&raw, &allowed))
    }

    pub fn card(url: &str) -> AgentCard {
        AgentCard::new("planner", url)
            .with_skill(
                "plan",
                "Turn a user request, retrieval hits and drone state into a validated plan",
                json!({"type": "object", "properties": {
                    "user_request": {"type": "string"},
                    "rag_hits": {"type": "array"},
                    "drone_state": {"type": "object"},
                    "available_tools": {"type": "array"}
                }, "required": ["user_request"]}),
                json!({"type": "object", "properties": {
                    "reasoning": {"type": "string"},
                    "needs_clarification": {"type": "boolean"},
                    "clarification_question": {"type": "string"},
                    "missing_locations": {"type": "array"},
                    "steps": {"type": "array"}
                }}),
            )
            .with_skill(
                "reflect",
                "Judge whether an executed plan achieved the goal and propose next steps",
                json!({"type": "object", "properties": {
                    "original_request": {"type": "string"},
                    "previous_plan": {"type": "object"},
                    "execution_result": {"type": "object"},
                    "current_drone_state": {"type": "object"},
                    "rag_hits": {"type": "array"},
                    "available_tools": {"type": "array"}
                }, "required": ["original_request"]}),
                json!({"type": "object", "properties": {
                    "observation": {"type": "string"},
                    "reasoning": {"type": "string"},
                    "goal_achieved": {"type": "boolean"},
                    "confidence": {"type": "number"},
                    "next_steps": {"type": "array"},
                    "summary": {"type": "string"}
                }}),
            )
    }

    pub fn server(self: &Arc<Self>, url: &str) -> A2aServer {
        let plan_agent = self.clone();
        let reflect_agent = self.clone();

        A2aServer::new(Self::card(url))
            .register(
                "plan",
                skill_handler(move |task| {
                    let agent = plan_agent.clone();
                    async move {
                        let input: PlanInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let plan = agent
                            .plan(&input)
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(plan).map_err(Into::into)
                    }
                }),
            )
            .register(
                "reflect",
                skill_handler(move |task| {
                    let agent = reflect_agent.clone();
                    async move {
                        let input: ReflectInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let reflection = agent
                            .reflect(&input)
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(reflection).map_err(Into::into)
                    }
                }),
            )
    }
}

fn allowed_names(tools: &[ToolDescriptor]) -> HashSet<String> {
    tools.iter().map(|t| t.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;

    fn agent() -> PlannerAgent {
        PlannerAgent::new(GeminiClient::new(&GeminiConfig {
            api_key: None,
            model: GeminiConfig::DEFAULT_MODEL.to_string(),
            embedding_model: GeminiConfig::DEFAULT_EMBEDDING_MODEL.to_string(),
        }))
    }

    #[tokio::test]
    async fn empty_catalog_forces_a_clarification_without_model_calls() {
        // No API key: any model call would fail, so a clarification plan
        // proves the catalog check short-circuits.
        let plan = agent()
            .plan(&PlanInput {
                user_request: "take off".into(),
                rag_hits: Vec::new(),
                drone_state: None,
                available_tools: Vec::new(),
            })
            .await
            .unwrap();
        assert!(plan.needs_clarification);
        assert!(plan.steps.is_empty());
        assert!(plan.reasoning.contains("NoToolsAvailable"));
    }

    #[tokio::test]
    async fn model_failure_is_fatal_for_the_plan_call() {
        let tools = vec![ToolDescriptor {
            name: "drone.take_off".into(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        }];
        let err = agent()
            .plan(&PlanInput {
                user_request: "take off".into(),
                rag_hits: Vec::new(),
                drone_state: None,
                available_tools: tools,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ModelError"));
    }
}
