/// Errors surfaced by the A2A transport.
///
/// Note that [`crate::a2a::A2aClient::submit`] never returns these directly:
/// it folds every failure into a `TaskResult { success: false, error }` so
/// callers get a uniform shape.
#[derive(Debug)]
pub enum A2aError {
    /// Network failure, timeout, or non-2xx status when calling another agent.
    Transport(String),
    /// The per-call deadline elapsed; the in-flight request was cancelled.
    Timeout { agent: String, skill: String },
    /// No handler is registered for the requested skill.
    UnknownSkill(String),
    /// No base URL is registered for the target agent.
    UnknownAgent(String),
    /// The skill handler failed.
    Handler(String),
    /// Task input did not match the skill's expected shape.
    InvalidInput(String),
}

impl std::fmt::Display for A2aError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            A2aError::Transport(msg) => write!(f, "TransportError: {msg}"),
            A2aError::Timeout { agent, skill } => {
                write!(f, "TransportError: deadline exceeded calling {agent}/{skill}")
            }
            A2aError::UnknownSkill(skill) => write!(f, "UnknownSkill: {skill}"),
            A2aError::UnknownAgent(agent) => write!(f, "UnknownAgent: {agent}"),
            A2aError::Handler(msg) => write!(f, "HandlerError: {msg}"),
            A2aError::InvalidInput(msg) => write!(f, "ValidationError: {msg}"),
        }
    }
}

impl std::error::Error for A2aError {}

impl From<reqwest::Error> for A2aError {
    fn from(err: reqwest::Error) -> Self {
        A2aError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for A2aError {
    fn from(err: serde_json::Error) -> Self {
        A2aError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_skill_is_distinctive() {
        let msg = A2aError::UnknownSkill("fly_backwards".into()).to_string();
        assert!(msg.starts_with("UnknownSkill"));
        assert!(msg.contains("fly_backwards"));
    }
}
