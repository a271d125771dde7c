use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::a2a::{skill_handler, A2aError, A2aServer, AgentCard};
use crate::config::McpConfig;
use crate::domain::{DroneState, ExecutionReport, PlanStep, StepResult, ToolDescriptor};
use crate::services::mcp::{McpError, ToolEndpoint};

/// Named convenience tool behind the `get_drone_state` skill.
pub const STATE_TOOL: &str = "drone.get_state";

#[derive(Debug, Deserialize)]
struct ExecuteInput {
    #[serde(default)]
    steps: Vec<PlanStep>,
    #[serde(default = "default_stop_on_error")]
    stop_on_error: bool,
}

fn default_stop_on_error() -> bool {
    true
}

/// Executor agent: owns the drone tool endpoint, its cached catalog, and
/// the step-by-step execution policy.
pub struct ExecutorAgent {
    endpoint: ToolEndpoint,
}

impl ExecutorAgent {
    pub fn new(config: &McpConfig) -> Self {
        Self {
            endpoint: ToolEndpoint::new(config),
        }
    }

    /// Refresh the catalog and return the descriptors.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        self.endpoint.refresh_catalog().await
    }

    /// Read the drone state via `drone.get_state`; one automatic catalog
    /// refresh is attempted when the tool is missing.
    pub async fn get_drone_state(&self) -> Result<DroneState, McpError> {
        self.endpoint.ensure_tool(STATE_TOOL).await.map_err(|e| match e {
            McpError::UnknownTool(name) => McpError::MissingTool(name),
            other => other,
        })?;
        let value = self.endpoint.call_tool(STATE_TOOL, json!({})).await?;
        serde_json::from_value::<DroneState>(value).map_err(|e| McpError::Invocation {
            tool: STATE_TOOL.to_string(),
            message: format!("state payload did not parse: {e}"),
        })
    }

    /// Execute plan steps in order, recording one result per step.
    ///
    /// Steps never run in parallel. With `stop_on_error` (the default), the
    /// first failure abandons the remainder of the plan.
    #[instrument(level = "info", skip(self, steps), fields(total = steps.len()))]
    pub async fn execute(&self, steps: Vec<PlanStep>, stop_on_error: bool) -> ExecutionReport {
        let total_steps = steps.len();
        let started = Instant::now();
        let mut results = Vec::with_capacity(total_steps);
        let mut completed_steps = 0;

        for (index, step) in steps.into_iter().enumerate() {
            let step_started = Instant::now();
            let outcome = self.run_step(&step).await;
            let duration_ms = step_started.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(value) => {
                    completed_steps += 1;
                    StepResult {
                        index,
                        tool: step.tool,
                        args: step.args,
                        success: true,
                        result: Some(value),
                        error: None,
                        duration_ms,
                    }
                }
                Err(e) => {
                    warn!(tool = %step.tool, error = %e, "step failed");
                    StepResult {
                        index,
                        tool: step.tool,
                        args: step.args,
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                        duration_ms,
                    }
                }
            };
            let failed = !result.success;
            results.push(result);
            if failed && stop_on_error {
                info!(completed = completed_steps, total = total_steps, "abandoning remaining steps");
                break;
            }
        }

        ExecutionReport {
            all_success: completed_steps == total_steps,
            completed_steps,
            total_steps,
            total_duration_ms: started.elapsed().as_millis() as u64,
            results,
        }
    }

    async fn run_step(&self, step: &PlanStep) -> Result<Value, McpError> {
        self.endpoint.ensure_tool(&step.tool).await?;
        self.endpoint.call_tool(&step.tool, step.args.clone()).await
    }

    /// Terminate the child endpoint on shutdown.
    pub async fn shutdown(&self) {
        self.endpoint.shutdown().await;
    }

    pub fn card(url: &str) -> AgentCard {
        AgentCard::new("executor", url)
            .with_skill(
                "list_tools",
                "Refresh and return the tool catalog discovered from the drone endpoint",
                json!({"type": "object", "properties": {}}),
                json!({"type": "object", "properties": {"tools": {"type": "array"}}}),
            )
            .with_skill(
                "get_drone_state",
                "Read the current drone state via drone.get_state",
                json!({"type": "object", "properties": {}}),
                json!({"type": "object", "properties": {
                    "position": {"type": "object"},
                    "is_active": {"type": "boolean"},
                    "queue_length": {"type": "integer"}
                }}),
            )
            .with_skill(
                "execute",
                "Execute plan steps in order against the drone endpoint",
                json!({"type": "object", "properties": {
                    "steps": {"type": "array"},
                    "stop_on_error": {"type": "boolean"}
                }, "required": ["steps"]}),
                json!({"type": "object", "properties": {
                    "results": {"type": "array"},
                    "all_success": {"type": "boolean"},
                    "completed_steps": {"type": "integer"},
                    "total_steps": {"type": "integer"},
                    "total_duration_ms": {"type": "integer"}
                }}),
            )
    }

    /// Wire the agent's skills onto an A2A server.
    pub fn server(self: &Arc<Self>, url: &str) -> A2aServer {
        let list_agent = self.clone();
        let state_agent = self.clone();
        let execute_agent = self.clone();

        A2aServer::new(Self::card(url))
            .register(
                "list_tools",
                skill_handler(move |_task| {
                    let agent = list_agent.clone();
                    async move {
                        let tools = agent
                            .list_tools()
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        Ok(json!({ "tools": tools }))
                    }
                }),
            )
            .register(
                "get_drone_state",
                skill_handler(move |_task| {
                    let agent = state_agent.clone();
                    async move {
                        let state = agent
                            .get_drone_state()
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(state).map_err(Into::into)
                    }
                }),
            )
            .register(
                "execute",
                skill_handler(move |task| {
                    let agent = execute_agent.clone();
                    async move {
                        let input: ExecuteInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let report = agent.execute(input.steps, input.stop_on_error).await;
                        serde_json::to_value(report).map_err(Into::into)
                    }
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn agent() -> ExecutorAgent {
        // No endpoint configured: every step fails with NotConfigured,
        // which is exactly what the policy tests need.
        ExecutorAgent::new(&McpConfig {
            server_path: None,
            mission_timeout: Duration::from_secs(1800),
            tool_timeout: Duration::from_secs(30),
        })
    }

    fn step(tool: &str) -> PlanStep {
        PlanStep {
            tool: tool.to_string(),
            args: json!({}),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn stop_on_error_abandons_the_rest() {
        let report = agent()
            .execute(vec![step("drone.take_off"), step("drone.move_to")], true)
            .await;
        assert_eq!(report.total_steps, 2);
        assert_eq!(report.results.len(), 1);
        assert!(!report.all_success);
        assert_eq!(report.completed_steps, 0);
        assert!(report.results[0].error.as_deref().unwrap().contains("TransportError"));
    }

    #[tokio::test]
    async fn without_stop_on_error_every_step_is_recorded() {
        let report = agent()
            .execute(vec![step("a"), step("b"), step("c")], false)
            .await;
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| !r.success));
        assert_eq!(report.completed_steps, 0);
    }

    #[tokio::test]
    async fn empty_plan_reports_success() {
        let report = agent().execute(Vec::new(), true).await;
        assert!(report.all_success);
        assert_eq!(report.total_steps, 0);
    }

    #[test]
    fn execute_input_defaults_stop_on_error() {
        let input: ExecuteInput = serde_json::from_value(json!({"steps": []})).unwrap();
        assert!(input.stop_on_error);
    }
}
