use std::time::Duration;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
    ProgressNotificationParam,
};
use rmcp::service::{NotificationContext, Peer, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::{ClientHandler, RoleClient, ServiceExt};
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::McpError;
use crate::config::McpConfig;
use crate::domain::ToolDescriptor;

/// The one long-running mission tool; it opts into the mission ceiling and
/// progress-reset deadline semantics.
pub const MISSION_TOOL: &str = "drone.run_mission";

/// Client handler that timestamps progress notifications so mission
/// invocations can rearm their watchdog.
#[derive(Clone)]
struct EndpointHandler {
    progress_tx: watch::Sender<Instant>,
}

impl ClientHandler for EndpointHandler {
    async fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) {
        debug!(progress = params.progress, "tool endpoint progress");
        let _ = self.progress_tx.send(Instant::now());
    }

    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

struct Connection {
    peer: Peer<RoleClient>,
    /// Keeps the transport alive; dropping it kills the child process.
    service: RunningService<RoleClient, EndpointHandler>,
}

/// The executor's connection to the drone tool endpoint.
///
/// Spawned lazily on first use as a child process speaking MCP over stdio,
/// then kept open. The discovered catalog is cached for the lifetime of the
/// endpoint and refreshed on miss or explicit request.
pub struct ToolEndpoint {
    command: Option<String>,
    default_timeout: Duration,
    mission_timeout: Duration,
    connection: Mutex<Option<Connection>>,
    catalog: RwLock<Vec<ToolDescriptor>>,
    progress_tx: watch::Sender<Instant>,
}

impl ToolEndpoint {
    pub fn new(config: &McpConfig) -> Self {
        let (progress_tx, _) = watch::channel(Instant::now());
        Self {
            command: config.server_path.clone(),
            default_timeout: config.tool_timeout,
            mission_timeout: config.mission_timeout,
            connection: Mutex::new(None),
            catalog: RwLock::new(Vec::new()),
            progress_tx,
        }
    }

    /// Deadline policy: mission-class tools get the configured ceiling,
    /// everything else the short default.
    pub fn timeout_for(&self, tool: &str) -> Duration {
        if tool == MISSION_TOOL {
            self.mission_timeout
        } else {
            self.default_timeout
        }
    }

    /// Connect if needed and return a peer handle for requests. The
    /// connection lock is only held while connecting, never across a call.
    async fn peer(&self) -> Result<Peer<RoleClient>, McpError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.peer.clone());
        }

        let command = self.command.as_deref().ok_or(McpError::NotConfigured)?;
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| McpError::Connection("empty MCP_SERVER_PATH".into()))?;
        let args: Vec<&str> = parts.collect();

        info!(%program, "spawning drone tool endpoint");
        let transport = TokioChildProcess::new(Command::new(program).configure(|cmd| {
            for arg in &args {
                cmd.arg(arg);
            }
        }))
        .map_err(|e| McpError::Connection(e.to_string()))?;

        let handler = EndpointHandler {
            progress_tx: self.progress_tx.clone(),
        };
        let service = handler
            .serve(transport)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        let peer = service.peer().clone();

        *slot = Some(Connection { peer: peer.clone(), service });
        drop(slot);

        // First connect also primes the catalog.
        Box::pin(self.refresh_catalog()).await?;
        Ok(peer)
    }

    /// Refresh the cached catalog from the endpoint.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh_catalog(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let existing = {
            let slot = self.connection.lock().await;
            slot.as_ref().map(|conn| conn.peer.clone())
        };
        let peer = match existing {
            Some(peer) => peer,
            // First use: connecting primes the catalog on its own.
            None => {
                self.peer().await?;
                return Ok(self.catalog.read().await.clone());
            }
        };

        let listing = peer
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Discovery(e.to_string()))?;

        let tools: Vec<ToolDescriptor> = listing
            .tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name.into_owned(),
                description: tool
                    .description
                    .map(|d| d.into_owned())
                    .unwrap_or_default(),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect();

        debug!(count = tools.len(), "tool catalog refreshed");
        *self.catalog.write().await = tools.clone();
        Ok(tools)
    }

    /// Cached catalog; connects and discovers on first use.
    pub async fn catalog(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        self.peer().await?;
        Ok(self.catalog.read().await.clone())
    }

    /// Verify a tool exists, attempting one automatic refresh on miss.
    pub async fn ensure_tool(&self, name: &str) -> Result<(), McpError> {
        self.peer().await?;
        if self.has_cached(name).await {
            return Ok(());
        }
        warn!(tool = name, "tool not in cached catalog, refreshing once");
        self.refresh_catalog().await?;
        if self.has_cached(name).await {
            Ok(())
        } else {
            Err(McpError::UnknownTool(name.to_string()))
        }
    }

    async fn has_cached(&self, name: &str) -> bool {
        self.catalog.read().await.iter().any(|t| t.name == name)
    }

    /// Invoke a tool under the per-tool deadline policy.
    ///
    /// Mission invocations rearm their deadline whenever the endpoint sends
    /// a progress notification; the default deadline never rearms.
    #[instrument(level = "debug", skip(self, args), fields(tool = name))]
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, McpError> {
        let peer = self.peer().await?;
        let param = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        };
        let ceiling = self.timeout_for(name);

        let result = if name == MISSION_TOOL {
            self.call_with_progress_reset(&peer, param, ceiling).await?
        } else {
            let started = Instant::now();
            match tokio::time::timeout(ceiling, peer.call_tool(param)).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    return Err(McpError::Invocation {
                        tool: name.to_string(),
                        message: e.to_string(),
                    })
                }
                Err(_) => {
                    return Err(McpError::Timeout {
                        tool: name.to_string(),
                        after_ms: started.elapsed().as_millis(),
                    })
                }
            }
        };

        parse_tool_result(name, result)
    }

    async fn call_with_progress_reset(
        &self,
        peer: &Peer<RoleClient>,
        param: CallToolRequestParam,
        ceiling: Duration,
    ) -> Result<CallToolResult, McpError> {
        let tool = param.name.to_string();
        let started = Instant::now();
        let mut progress = self.progress_tx.subscribe();
        let mut armed_at = Instant::now();

        let call = peer.call_tool(param);
        tokio::pin!(call);

        loop {
            tokio::select! {
                result = &mut call => {
                    return result.map_err(|e| McpError::Invocation {
                        tool: tool.clone(),
                        message: e.to_string(),
                    });
                }
                changed = progress.changed() => {
                    if changed.is_ok() {
                        armed_at = *progress.borrow();
                    }
                }
                _ = tokio::time::sleep_until(armed_at + ceiling) => {
                    return Err(McpError::Timeout {
                        tool: tool.clone(),
                        after_ms: started.elapsed().as_millis(),
                    });
                }
            }
        }
    }

    /// Terminate the child process. Called on shutdown.
    pub async fn shutdown(&self) {
        if let Some(conn) = self.connection.lock().await.take() {
            info!("stopping drone tool endpoint");
            let _ = conn.service.cancel().await;
        }
    }
}

/// Flatten an MCP call result to a JSON value: the first text block is
/// parsed as JSON when possible, otherwise surfaced as `{"text": ...}`.
fn parse_tool_result(tool: &str, result: CallToolResult) -> Result<Value, McpError> {
    let text = result
        .content
        .iter()
        .find_map(|c| c.as_text().map(|t| t.text.clone()));

    if result.is_error.unwrap_or(false) {
        return Err(McpError::Invocation {
            tool: tool.to_string(),
            message: text.unwrap_or_else(|| "tool reported an error".to_string()),
        });
    }

    Ok(match text {
        Some(text) => serde_json::from_str::<Value>(&text).unwrap_or(json!({ "text": text })),
        None => json!({}),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(config_path: Option<&str>) -> ToolEndpoint {
        ToolEndpoint::new(&McpConfig {
            server_path: config_path.map(str::to_string),
            mission_timeout: Duration::from_millis(McpConfig::DEFAULT_MISSION_TIMEOUT_MS),
            tool_timeout: Duration::from_secs(McpConfig::DEFAULT_TOOL_TIMEOUT_SECS),
        })
    }

    #[test]
    fn mission_tool_gets_the_long_ceiling() {
        let endpoint = endpoint(Some("node server.js"));
        assert_eq!(
            endpoint.timeout_for(MISSION_TOOL),
            Duration::from_millis(1_800_000)
        );
        assert_eq!(
            endpoint.timeout_for("drone.take_off"),
            Duration::from_secs(30)
        );
    }

    #[tokio::test]
    async fn unconfigured_endpoint_fails_without_spawning() {
        let endpoint = endpoint(None);
        let err = endpoint.catalog().await.unwrap_err();
        assert!(matches!(err, McpError::NotConfigured));
    }
}
