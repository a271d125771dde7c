use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::card::{AgentCard, WELL_KNOWN_CARD_PATH};
use super::error::A2aError;
use super::task::{Task, TaskResult};

/// Boxed async skill handler, dispatched by skill id.
pub type SkillHandler = Arc<
    dyn Fn(Task) -> Pin<Box<dyn Future<Output = Result<Value, A2aError>> + Send>> + Send + Sync,
>;

/// Wrap an async fn/closure into a [`SkillHandler`].
pub fn skill_handler<F, Fut>(f: F) -> SkillHandler
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, A2aError>> + Send + 'static,
{
    Arc::new(move |task| Box::pin(f(task)))
}

struct ServerState {
    card: AgentCard,
    handlers: HashMap<String, SkillHandler>,
}

/// Hosts one agent behind the uniform A2A surface: capability card,
/// liveness ping, and task submission dispatched by skill id.
pub struct A2aServer {
    card: AgentCard,
    handlers: HashMap<String, SkillHandler>,
}

impl A2aServer {
    pub fn new(card: AgentCard) -> Self {
        Self {
            card,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a skill id. The handler table is validated
    /// against the agent card: a handler without a card entry is a wiring
    /// bug and is rejected loudly at startup.
    pub fn register(mut self, skill: &str, handler: SkillHandler) -> Self {
        if !self.card.has_skill(skill) {
            panic!(
                "skill `{skill}` has a handler but no entry on the `{}` agent card",
                self.card.name
            );
        }
        self.handlers.insert(skill.to_string(), handler);
        self
    }

    pub fn router(self) -> Router {
        for skill in &self.card.skills {
            if !self.handlers.contains_key(&skill.id) {
                warn!(
                    agent = %self.card.name,
                    skill = %skill.id,
                    "card advertises a skill without a registered handler"
                );
            }
        }
        let state = Arc::new(ServerState {
            card: self.card,
            handlers: self.handlers,
        });
        Router::new()
            .route(WELL_KNOWN_CARD_PATH, get(agent_card))
            .route("/ping", get(ping))
            .route("/tasks", post(submit_task))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind and serve until `shutdown` resolves; in-flight handlers drain.
    pub async fn serve(
        self,
        port: u16,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), A2aError> {
        let name = self.card.name.clone();
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| A2aError::Transport(format!("bind failed on port {port}: {e}")))?;
        info!(agent = %name, port, "a2a server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| A2aError::Transport(e.to_string()))
    }
}

async fn agent_card(State(state): State<Arc<ServerState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}

async fn ping() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn submit_task(
    State(state): State<Arc<ServerState>>,
    Json(task): Json<Task>,
) -> Json<TaskResult> {
    let started = Instant::now();
    let task_id = task.id;

    let Some(handler) = state.handlers.get(&task.skill) else {
        let err = A2aError::UnknownSkill(task.skill.clone());
        warn!(agent = %state.card.name, skill = %task.skill, "task for unregistered skill");
        return Json(TaskResult::fail(
            task_id,
            err.to_string(),
            started.elapsed().as_millis() as u64,
        ));
    };

    let result = handler(task).await;
    let duration_ms = started.elapsed().as_millis() as u64;
    Json(match result {
        Ok(output) => TaskResult::ok(task_id, output, duration_ms),
        Err(err) => TaskResult::fail(task_id, err.to_string(), duration_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::A2aClient;
    use crate::a2a::AgentName;
    use serde_json::json;

    fn echo_card(url: &str) -> AgentCard {
        AgentCard::new("executor", url).with_skill(
            "echo",
            "Echo the input back",
            json!({"type": "object"}),
            json!({"type": "object"}),
        )
    }

    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");
        let server = A2aServer::new(echo_card(&url)).register(
            "echo",
            skill_handler(|task: Task| async move { Ok(json!({"echo": task.input})) }),
        );
        tokio::spawn(async move {
            axum::serve(listener, server.router()).await.unwrap();
        });
        url
    }

    #[tokio::test]
    async fn dispatches_registered_skill() {
        let url = spawn_server().await;
        let mut client = A2aClient::new();
        client.register(AgentName::Executor, url);

        let result = client
            .submit(
                AgentName::Executor,
                "echo",
                json!({"x": 1}),
                Default::default(),
            )
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output.unwrap()["echo"]["x"], 1);
    }

    #[tokio::test]
    async fn unknown_skill_fails_distinctively() {
        let url = spawn_server().await;
        let mut client = A2aClient::new();
        client.register(AgentName::Executor, url);

        let result = client
            .submit(AgentName::Executor, "nope", json!({}), Default::default())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("UnknownSkill"));
    }

    #[tokio::test]
    async fn serves_card_and_ping() {
        let url = spawn_server().await;
        let mut client = A2aClient::new();
        client.register(AgentName::Executor, url);

        assert!(client.ping(AgentName::Executor).await);
        let card = client.fetch_card(AgentName::Executor).await.unwrap();
        assert_eq!(card.name, "executor");
        assert!(card.has_skill("echo"));
    }

    #[test]
    #[should_panic(expected = "no entry")]
    fn registering_a_skill_missing_from_the_card_panics() {
        let card = AgentCard::new("executor", "http://127.0.0.1:1");
        let _ = A2aServer::new(card).register(
            "echo",
            skill_handler(|_task: Task| async move { Ok(json!({})) }),
        );
    }
}
