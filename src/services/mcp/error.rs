/// Failures at the drone tool endpoint.
#[derive(Debug)]
pub enum McpError {
    /// `MCP_SERVER_PATH` is not set; there is nothing to connect to.
    NotConfigured,
    /// Spawning or initializing the child process failed.
    Connection(String),
    /// Listing tools failed.
    Discovery(String),
    /// A planned tool is absent from the discovered catalog (after one
    /// automatic refresh).
    UnknownTool(String),
    /// A tool the system refers to by name (e.g. `drone.get_state`) is
    /// missing from the catalog.
    MissingTool(String),
    /// The endpoint returned an error payload for the invocation.
    Invocation { tool: String, message: String },
    /// The per-tool deadline elapsed.
    Timeout { tool: String, after_ms: u128 },
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McpError::NotConfigured => write!(f, "TransportError: MCP_SERVER_PATH is not configured"),
            McpError::Connection(msg) => write!(f, "TransportError: tool endpoint connection: {msg}"),
            McpError::Discovery(msg) => write!(f, "TransportError: tool discovery: {msg}"),
            McpError::UnknownTool(name) => write!(f, "UnknownTool: {name}"),
            McpError::MissingTool(name) => write!(f, "MissingTool: {name}"),
            McpError::Invocation { tool, message } => {
                write!(f, "ToolInvocationError: {tool}: {message}")
            }
            McpError::Timeout { tool, after_ms } => {
                write!(f, "ToolInvocationError: {tool}: timed out after {after_ms} ms")
            }
        }
    }
}

impl std::error::Error for McpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_prefixes_are_stable() {
        assert!(McpError::UnknownTool("x".into()).to_string().starts_with("UnknownTool"));
        assert!(McpError::MissingTool("x".into()).to_string().starts_with("MissingTool"));
        assert!(McpError::Invocation { tool: "t".into(), message: "m".into() }
            .to_string()
            .starts_with("ToolInvocationError"));
    }
}
