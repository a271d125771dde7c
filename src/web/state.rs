use std::sync::Arc;

use crate::agents::Orchestrator;

/// Shared state for the user-facing API. The web layer is a thin adapter:
/// everything of substance lives behind the orchestrator handle.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}
