use std::time::Duration;

use tracing::{debug, warn};

use crate::a2a::{AgentName, DEFAULT_TASK_TIMEOUT};

/// Gemini model and embedding settings (`GEMINI_*`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (`GEMINI_API_KEY`). Absent key means model-backed features degrade.
    pub api_key: Option<String>,
    /// Completion model (`GEMINI_MODEL`).
    pub model: String,
    /// Embedding model (`GEMINI_EMBEDDING_MODEL`).
    pub embedding_model: String,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "gemini-embedding-001";
}

/// Supabase vector store settings (`SUPABASE_*`).
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.service_role_key.is_some()
    }
}

/// Listen ports for the four A2A agents and the user-facing web API.
#[derive(Debug, Clone, Copy)]
pub struct Ports {
    pub orchestrator: u16,
    pub planner: u16,
    pub retriever: u16,
    pub executor: u16,
    pub web: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            orchestrator: 9000,
            planner: 9001,
            retriever: 9002,
            executor: 9003,
            web: 3000,
        }
    }
}

impl Ports {
    /// Loopback base URL for one agent, as registered with the A2A client.
    pub fn agent_url(&self, agent: AgentName) -> String {
        let port = match agent {
            AgentName::Orchestrator => self.orchestrator,
            AgentName::Planner => self.planner,
            AgentName::Retriever => self.retriever,
            AgentName::Executor => self.executor,
        };
        format!("http://127.0.0.1:{port}")
    }
}

/// Drone MCP endpoint settings (`MCP_*`).
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Command line used to spawn the tool endpoint child process.
    pub server_path: Option<String>,
    /// Ceiling for mission-class tools, reset on progress notifications.
    pub mission_timeout: Duration,
    /// Deadline applied to every other tool invocation.
    pub tool_timeout: Duration,
}

impl McpConfig {
    pub const DEFAULT_MISSION_TIMEOUT_MS: u64 = 1_800_000;
    pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
}

/// Environment configuration, read once at startup.
///
/// Every recognized key lives here so the rest of the crate never touches
/// `std::env` directly.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub gemini: GeminiConfig,
    pub supabase: SupabaseConfig,
    pub ports: Ports,
    pub mcp: McpConfig,
    /// `DEBUG=true` raises the default log filter to debug.
    pub debug: bool,
    /// Default deadline for A2A task submission.
    pub task_timeout: Duration,
}

impl EnvConfig {
    pub fn load() -> Self {
        let gemini = GeminiConfig {
            api_key: read_key("GEMINI_API_KEY"),
            model: read_key("GEMINI_MODEL")
                .unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string()),
            embedding_model: read_key("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| GeminiConfig::DEFAULT_EMBEDDING_MODEL.to_string()),
        };

        let supabase = SupabaseConfig {
            url: read_key("SUPABASE_URL"),
            service_role_key: read_key("SUPABASE_SERVICE_ROLE_KEY"),
        };

        let defaults = Ports::default();
        let ports = Ports {
            orchestrator: read_port("A2A_ORCHESTRATOR_PORT", defaults.orchestrator),
            planner: read_port("A2A_PLANNER_PORT", defaults.planner),
            retriever: read_port("A2A_RAG_PORT", defaults.retriever),
            executor: read_port("A2A_EXECUTOR_PORT", defaults.executor),
            web: read_port("WEB_API_PORT", defaults.web),
        };

        let mission_ms = read_key("MCP_MISSION_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(McpConfig::DEFAULT_MISSION_TIMEOUT_MS);
        let mcp = McpConfig {
            server_path: read_key("MCP_SERVER_PATH"),
            mission_timeout: Duration::from_millis(mission_ms),
            tool_timeout: Duration::from_secs(McpConfig::DEFAULT_TOOL_TIMEOUT_SECS),
        };

        let config = Self {
            gemini,
            supabase,
            ports,
            mcp,
            debug: read_bool("DEBUG"),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        };
        config.log_status();
        config
    }

    /// Warn about missing capability keys. Never fatal: the system runs in a
    /// degraded mode (clarifications instead of plans, empty retrieval).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.gemini.api_key.is_none() {
            warnings.push("GEMINI_API_KEY is not set; planning and retrieval need it".to_string());
        }
        if !self.supabase.is_configured() {
            warnings.push(
                "SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY are not set; retrieval returns no hits"
                    .to_string(),
            );
        }
        if self.mcp.server_path.is_none() {
            warnings.push("MCP_SERVER_PATH is not set; the executor has no tool endpoint".to_string());
        }
        for w in &warnings {
            warn!("{w}");
        }
        warnings
    }

    fn log_status(&self) {
        debug!(
            gemini_key = self.gemini.api_key.is_some(),
            model = %self.gemini.model,
            embedding_model = %self.gemini.embedding_model,
            supabase = self.supabase.is_configured(),
            mcp = self.mcp.server_path.is_some(),
            "environment configuration loaded"
        );
    }
}

fn read_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_port(name: &str, default: u16) -> u16 {
    read_key(name)
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default)
}

fn read_bool(name: &str) -> bool {
    matches!(
        read_key(name).map(|v| v.to_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}
