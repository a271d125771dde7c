use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;
use tracing::warn;

use super::event::AgentEvent;

/// Subscription pattern matching every event type.
pub const WILDCARD: &str = "*";

const SUBSCRIBER_BUFFER: usize = 256;

struct Subscription {
    pattern: String,
    tx: Sender<AgentEvent>,
}

impl Subscription {
    fn matches(&self, event_type: &str) -> bool {
        self.pattern == WILDCARD || self.pattern == event_type
    }
}

/// In-process event publisher.
///
/// Subscribers register by exact event type or [`WILDCARD`] and receive
/// events over an mpsc channel, preserving publish order. Publishing never
/// blocks the critical path: a subscriber that falls behind loses events
/// (with a warning) instead of stalling the request.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, pattern: impl Into<String>) -> Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.lock().await.push(Subscription {
            pattern: pattern.into(),
            tx,
        });
        rx
    }

    pub async fn publish(&self, event: AgentEvent) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|sub| !sub.tx.is_closed());
        for sub in subscribers.iter() {
            if !sub.matches(&event.event_type) {
                continue;
            }
            if let Err(mpsc::error::TrySendError::Full(_)) = sub.tx.try_send(event.clone()) {
                warn!(
                    event_type = %event.event_type,
                    pattern = %sub.pattern,
                    "event subscriber is not keeping up; dropping event"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::phase;
    use serde_json::json;

    #[tokio::test]
    async fn wildcard_subscriber_sees_everything_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(WILDCARD).await;

        bus.publish(AgentEvent::start("r1", "orchestrator", phase::RAG, json!({})))
            .await;
        bus.publish(AgentEvent::end("r1", "orchestrator", phase::RAG, json!({"hits": 3})))
            .await;

        assert_eq!(rx.recv().await.unwrap().event_type, "rag_start");
        assert_eq!(rx.recv().await.unwrap().event_type, "rag_end");
    }

    #[tokio::test]
    async fn typed_subscriber_only_sees_its_type() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("plan_end").await;

        bus.publish(AgentEvent::start("r1", "o", phase::PLAN, json!({})))
            .await;
        bus.publish(AgentEvent::end("r1", "o", phase::PLAN, json!({})))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "plan_end");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(WILDCARD).await;
        drop(rx);

        bus.publish(AgentEvent::start("r1", "o", phase::PLAN, json!({})))
            .await;
        assert!(bus.subscribers.lock().await.is_empty());
    }
}
