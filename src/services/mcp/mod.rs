mod endpoint;
mod error;

pub use endpoint::{ToolEndpoint, MISSION_TOOL};
pub use error::McpError;
