use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn kept in session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// In-memory conversation. Lives from first chat until an explicit clear.
///
/// Invariant: `history.len() <= 2 * max_history_length` — the bound covers
/// `max_history_length` turns per side; oldest entries are evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub const DEFAULT_MAX_HISTORY: usize = 10;

    pub fn new(id: String) -> Self {
        Self {
            id,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a turn, evicting the oldest entries past the bound.
    pub fn push_turn(&mut self, turn: ChatTurn, max_history_length: usize) {
        self.history.push(turn);
        let bound = 2 * max_history_length;
        if self.history.len() > bound {
            let excess = self.history.len() - bound;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let mut session = Session::new("s".into());
        for i in 0..25 {
            session.push_turn(ChatTurn::user(format!("msg {i}")), 10);
        }
        assert_eq!(session.history.len(), 20);
        assert_eq!(session.history.first().unwrap().content, "msg 5");
        assert_eq!(session.history.last().unwrap().content, "msg 24");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let turn = ChatTurn::assistant("ok");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "assistant");
    }
}
