mod card;
mod client;
mod error;
mod server;
mod task;

pub use card::{AgentCard, SkillCard, WELL_KNOWN_CARD_PATH};
pub use client::{A2aClient, SubmitOptions, DEFAULT_TASK_TIMEOUT};
pub use error::A2aError;
pub use server::{skill_handler, A2aServer, SkillHandler};
pub use task::{Task, TaskResult};

use std::fmt;

/// The four cooperating agents, used as registry keys for A2A dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentName {
    Orchestrator,
    Planner,
    Retriever,
    Executor,
}

impl AgentName {
    pub const ALL: [AgentName; 4] = [
        AgentName::Orchestrator,
        AgentName::Planner,
        AgentName::Retriever,
        AgentName::Executor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Orchestrator => "orchestrator",
            AgentName::Planner => "planner",
            AgentName::Retriever => "retriever",
            AgentName::Executor => "executor",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
