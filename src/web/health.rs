use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;

use super::state::AppState;
use crate::a2a::AgentName;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agents: HashMap<String, bool>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// `GET /api/health`: ping every agent and summarize.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let client = &state.orchestrator.client;
    let (retriever, planner, executor) = tokio::join!(
        client.ping(AgentName::Retriever),
        client.ping(AgentName::Planner),
        client.ping(AgentName::Executor),
    );

    let mut agents = HashMap::new();
    // The orchestrator answers in-process.
    agents.insert(AgentName::Orchestrator.as_str().to_string(), true);
    agents.insert(AgentName::Retriever.as_str().to_string(), retriever);
    agents.insert(AgentName::Planner.as_str().to_string(), planner);
    agents.insert(AgentName::Executor.as_str().to_string(), executor);

    let up = [retriever, planner, executor].iter().filter(|b| **b).count();
    let status = match up {
        3 => "healthy",
        0 => "unhealthy",
        _ => "degraded",
    };

    Json(HealthResponse {
        status,
        agents,
        timestamp: Utc::now(),
    })
}
