mod chat;
mod health;
mod sessions;
mod state;
mod stream;

pub use state::AppState;

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agents::Orchestrator;

/// Build the user-facing API router.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/stream", post(stream::chat_stream))
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/{id}/history", get(sessions::session_history))
        .route("/api/sessions/{id}", delete(sessions::delete_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    orchestrator: Arc<Orchestrator>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "web api listening");
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::A2aClient;
    use crate::events::EventBus;
    use serde_json::Value;
    use std::time::Duration;

    async fn spawn_api() -> String {
        let client = Arc::new(A2aClient::new());
        let events = Arc::new(EventBus::new());
        let orchestrator = Arc::new(Orchestrator::new(
            client,
            events,
            Duration::from_secs(1800),
        ));
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(orchestrator);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn session_lifecycle_round_trips() {
        let base = spawn_api().await;
        let http = reqwest::Client::new();

        let created: Value = http
            .post(format!("{base}/api/sessions"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["session_id"].as_str().unwrap().to_string();

        let deleted: Value = http
            .delete(format!("{base}/api/sessions/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(deleted["success"], true);

        let history: Value = http
            .get(format!("{base}/api/sessions/{id}/history"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history["history"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn chat_requires_a_message() {
        let base = spawn_api().await;
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{base}/api/chat"))
            .json(&serde_json::json!({"message": "  "}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn health_reports_down_agents_as_degraded_or_worse() {
        // No agents registered on the client: every ping fails.
        let base = spawn_api().await;
        let http = reqwest::Client::new();
        let health: Value = http
            .get(format!("{base}/api/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "unhealthy");
        assert_eq!(health["agents"]["orchestrator"], true);
        assert_eq!(health["agents"]["planner"], false);
    }
}
