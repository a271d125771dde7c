mod answer;
mod react;
mod sessions;

pub use sessions::SessionStore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::a2a::{skill_handler, A2aClient, A2aError, A2aServer, AgentCard, AgentName};
use crate::domain::{ChatRequest, ChatResponse, ChatTurn, Session};
use crate::events::{phase, AgentEvent, EventBus};

/// Bound on plan→act→observe→reflect rounds per request.
pub const MAX_REACT_ITERATIONS: usize = 3;
/// Bound on targeted re-retrieval rounds per request.
pub const MAX_RAG_RETRIES: usize = 2;

/// The coordinating agent: owns sessions and the event publisher, fans out
/// to the retriever, planner and executor, and runs the bounded ReAct loop.
pub struct Orchestrator {
    pub(crate) client: Arc<A2aClient>,
    sessions: SessionStore,
    events: Arc<EventBus>,
    pub(crate) max_iterations: usize,
    pub(crate) max_rag_retries: usize,
    pub(crate) mission_timeout: Duration,
}

impl Orchestrator {
    pub fn new(client: Arc<A2aClient>, events: Arc<EventBus>, mission_timeout: Duration) -> Self {
        Self {
            client,
            sessions: SessionStore::new(Session::DEFAULT_MAX_HISTORY),
            events,
            max_iterations: MAX_REACT_ITERATIONS,
            max_rag_retries: MAX_RAG_RETRIES,
            mission_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Handle one chat request end to end.
    ///
    /// The session lock is held for the whole request, serializing
    /// concurrent chats on the same session id.
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let started = Instant::now();
        let (session_id, session) = self.sessions.get_or_create(request.session_id.clone()).await;
        // Held for the whole request: concurrent chats on one session queue.
        let mut session = session.lock().await;

        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info!(%session_id, %request_id, "chat request started");

        self.emit(AgentEvent::start(
            &request_id,
            AgentName::Orchestrator.as_str(),
            phase::REQUEST,
            json!({"message": request.message, "session_id": session_id}),
        ))
        .await;

        session.push_turn(ChatTurn::user(&request.message), self.sessions.max_history());

        let mut response = self.run_request(&request, &request_id).await;
        response.session_id = session_id.clone();
        response.request_id = request_id.clone();
        response.duration_ms = started.elapsed().as_millis() as u64;

        session.push_turn(ChatTurn::assistant(&response.answer), self.sessions.max_history());

        self.emit(AgentEvent::end(
            &request_id,
            AgentName::Orchestrator.as_str(),
            phase::REQUEST,
            json!({
                "success": response.success,
                "goal_achieved": response.goal_achieved,
                "react_iterations": response.react_iterations,
            }),
        ))
        .await;

        response
    }

    pub(crate) async fn emit(&self, event: AgentEvent) {
        self.events.publish(event).await;
    }

    /// Boot-time fan-out: ping the remote agents and fetch their cards so a
    /// degraded deployment shows up in the logs immediately.
    pub async fn startup_probe(&self) {
        for agent in [AgentName::Retriever, AgentName::Planner, AgentName::Executor] {
            if !self.client.ping(agent).await {
                warn!(%agent, "agent is not answering its ping");
                continue;
            }
            match self.client.fetch_card(agent).await {
                Ok(card) => info!(%agent, skills = card.skills.len(), "agent card fetched"),
                Err(e) => warn!(%agent, error = %e, "agent card fetch failed"),
            }
        }
    }

    pub fn card(url: &str) -> AgentCard {
        AgentCard::new("orchestrator", url).with_skill(
            "chat",
            "Run a natural-language drone request through the ReAct loop",
            json!({"type": "object", "properties": {
                "message": {"type": "string"},
                "session_id": {"type": "string"},
                "map_id": {"type": "string"},
                "filters": {"type": "object"}
            }, "required": ["message"]}),
            json!({"type": "object", "properties": {
                "session_id": {"type": "string"},
                "request_id": {"type": "string"},
                "answer": {"type": "string"},
                "goal_achieved": {"type": "boolean"},
                "react_iterations": {"type": "integer"}
            }}),
        )
    }

    pub fn server(self: &Arc<Self>, url: &str) -> A2aServer {
        let chat_agent = self.clone();
        A2aServer::new(Self::card(url)).register(
            "chat",
            skill_handler(move |task| {
                let agent = chat_agent.clone();
                async move {
                    let request: ChatRequest = serde_json::from_value(task.input)
                        .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                    if request.message.trim().is_empty() {
                        return Err(A2aError::InvalidInput("message is required".into()));
                    }
                    let response = agent.chat(request).await;
                    serde_json::to_value(response).map_err(Into::into)
                }
            }),
        )
    }
}
