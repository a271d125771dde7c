use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use super::card::{AgentCard, WELL_KNOWN_CARD_PATH};
use super::error::A2aError;
use super::task::{Task, TaskResult};
use super::AgentName;
use crate::config::Ports;

/// Default per-call deadline for task submission.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(120);

const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-call submission knobs.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub session_id: Option<String>,
    /// Overrides [`DEFAULT_TASK_TIMEOUT`]. Exceeding the deadline cancels
    /// the in-flight request and yields a failed result.
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            session_id: None,
            timeout: Some(timeout),
        }
    }
}

/// A2A task client with a name→URL registry populated at startup.
///
/// `submit` never errors at the type level: transport failures, timeouts and
/// handler errors all come back as a `TaskResult` with `success = false`.
pub struct A2aClient {
    http: reqwest::Client,
    registry: HashMap<AgentName, String>,
}

impl A2aClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            registry: HashMap::new(),
        }
    }

    /// Registry for the standard loopback deployment.
    pub fn from_ports(ports: &Ports) -> Self {
        let mut client = Self::new();
        for agent in AgentName::ALL {
            client.register(agent, ports.agent_url(agent));
        }
        client
    }

    pub fn register(&mut self, agent: AgentName, url: String) {
        self.registry.insert(agent, url.trim_end_matches('/').to_string());
    }

    pub fn url_of(&self, agent: AgentName) -> Option<&str> {
        self.registry.get(&agent).map(String::as_str)
    }

    /// Submit a task and wait for its result under the per-call deadline.
    pub async fn submit(
        &self,
        agent: AgentName,
        skill: &str,
        input: Value,
        opts: SubmitOptions,
    ) -> TaskResult {
        let task = Task::new(skill, input).with_session(opts.session_id.clone());
        let task_id = task.id;
        let started = Instant::now();

        let Some(base) = self.registry.get(&agent) else {
            return TaskResult::fail(task_id, A2aError::UnknownAgent(agent.to_string()).to_string(), 0);
        };
        let url = format!("{base}/tasks");
        let deadline = opts.timeout.unwrap_or(DEFAULT_TASK_TIMEOUT);

        debug!(%agent, skill, task_id = %task_id, "submitting a2a task");
        let outcome = tokio::time::timeout(deadline, self.post_task(&url, &task)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(%agent, skill, %err, "a2a task failed");
                TaskResult::fail(task_id, err.to_string(), duration_ms)
            }
            Err(_elapsed) => {
                let err = A2aError::Timeout {
                    agent: agent.to_string(),
                    skill: skill.to_string(),
                };
                warn!(%agent, skill, deadline_ms = deadline.as_millis() as u64, "a2a task timed out");
                TaskResult::fail(task_id, err.to_string(), duration_ms)
            }
        }
    }

    async fn post_task(&self, url: &str, task: &Task) -> Result<TaskResult, A2aError> {
        let response = self.http.post(url).json(task).send().await?;
        if !response.status().is_success() {
            return Err(A2aError::Transport(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(response.json::<TaskResult>().await?)
    }

    /// Liveness probe against `/ping`.
    pub async fn ping(&self, agent: AgentName) -> bool {
        let Some(base) = self.registry.get(&agent) else {
            return false;
        };
        let request = self.http.get(format!("{base}/ping")).send();
        matches!(
            tokio::time::timeout(PING_TIMEOUT, request).await,
            Ok(Ok(response)) if response.status().is_success()
        )
    }

    /// Fetch the capability descriptor from the well-known path.
    pub async fn fetch_card(&self, agent: AgentName) -> Result<AgentCard, A2aError> {
        let base = self
            .registry
            .get(&agent)
            .ok_or_else(|| A2aError::UnknownAgent(agent.to_string()))?;
        let response = self
            .http
            .get(format!("{base}{WELL_KNOWN_CARD_PATH}"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(A2aError::Transport(format!(
                "card fetch returned {}",
                response.status()
            )));
        }
        Ok(response.json::<AgentCard>().await?)
    }
}

impl Default for A2aClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unregistered_agent_fails_without_network() {
        let client = A2aClient::new();
        let result = client
            .submit(AgentName::Planner, "plan", json!({}), SubmitOptions::default())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("UnknownAgent"));
    }

    #[tokio::test]
    async fn unreachable_agent_times_out_as_failed_result() {
        let mut client = A2aClient::new();
        // RFC 5737 TEST-NET address: never routable.
        client.register(AgentName::Planner, "http://192.0.2.1:9".to_string());
        let result = client
            .submit(
                AgentName::Planner,
                "plan",
                json!({}),
                SubmitOptions::with_timeout(Duration::from_millis(50)),
            )
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("TransportError"));
    }
}
