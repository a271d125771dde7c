use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{ChatTurn, Session};

/// In-memory session store, owned by the orchestrator.
///
/// Each session sits behind its own lock; `chat` holds it for the whole
/// request, so concurrent chats on one session id queue instead of
/// interleaving history writes.
pub struct SessionStore {
    max_history: usize,
    inner: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Create an empty session and return its id.
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.inner
            .lock()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(Session::new(id.clone()))));
        id
    }

    /// Fetch an existing session or create one (fresh id when none given,
    /// adopting the caller's id when it names an unknown session).
    pub async fn get_or_create(&self, id: Option<String>) -> (String, Arc<Mutex<Session>>) {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut inner = self.inner.lock().await;
        let session = inner
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(id.clone()))))
            .clone();
        (id, session)
    }

    pub async fn history(&self, id: &str) -> Option<Vec<ChatTurn>> {
        let session = self.inner.lock().await.get(id).cloned()?;
        let session = session.lock().await;
        Some(session.history.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.inner.lock().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Session;

    #[tokio::test]
    async fn create_then_remove_leaves_no_history() {
        let store = SessionStore::new(Session::DEFAULT_MAX_HISTORY);
        let id = store.create().await;
        assert_eq!(store.history(&id).await.unwrap().len(), 0);
        assert!(store.remove(&id).await);
        assert!(store.history(&id).await.is_none());
        assert!(!store.remove(&id).await);
    }

    #[tokio::test]
    async fn get_or_create_adopts_caller_ids() {
        let store = SessionStore::new(Session::DEFAULT_MAX_HISTORY);
        let (id, session) = store.get_or_create(Some("pilot-1".into())).await;
        assert_eq!(id, "pilot-1");
        session
            .lock()
            .await
            .push_turn(ChatTurn::user("hello"), store.max_history());
        let (again, _) = store.get_or_create(Some("pilot-1".into())).await;
        assert_eq!(again, "pilot-1");
        assert_eq!(store.history("pilot-1").await.unwrap().len(), 1);
    }
}
