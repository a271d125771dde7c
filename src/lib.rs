//! Wingman crate root
//!
//! A multi-agent drone copilot: natural-language requests become verified
//! tool-call sequences against a drone MCP endpoint. Four agents —
//! orchestrator, retriever, planner, executor — run behind a uniform A2A
//! task protocol; the orchestrator composes them in a bounded ReAct loop
//! (plan, act, observe, reflect).
//!
//! Talking to a running deployment goes through the A2A client:
//!
//! ```no_run
//! use wingman::config::Ports;
//! use wingman::{A2aClient, AgentName};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = A2aClient::from_ports(&Ports::default());
//!     let result = client
//!         .submit(
//!             AgentName::Orchestrator,
//!             "chat",
//!             serde_json::json!({"message": "take off to 1.5m"}),
//!             Default::default(),
//!         )
//!         .await;
//!     println!("{:#?}", result.output);
//! }
//! ```

#![forbid(unsafe_code)]

pub mod a2a;
pub mod agents;
pub mod config;
pub mod domain;
pub mod events;
pub mod observability;
pub mod repl;
pub mod services;
pub mod web;

pub use crate::a2a::{A2aClient, A2aError, A2aServer, AgentCard, AgentName, Task, TaskResult};
pub use crate::agents::{ExecutorAgent, Orchestrator, PlannerAgent, RetrieverAgent};
pub use crate::config::EnvConfig;
pub use crate::domain::{ChatRequest, ChatResponse, DroneState, Plan, Reflection};
pub use crate::events::{AgentEvent, EventBus};
pub use crate::observability::init_default_tracing;
