pub mod chat;
pub mod drone;
pub mod execution;
pub mod json;
pub mod plan;
pub mod reflection;
pub mod retrieval;
pub mod session;
pub mod tool;

pub use chat::{ChatRequest, ChatResponse};
pub use drone::{DroneState, Position};
pub use execution::{ExecutionReport, StepResult};
pub use plan::{Plan, PlanStep};
pub use reflection::Reflection;
pub use retrieval::{RetrievalFilters, RetrievalHit, RetrievalIntent, RetrievalOutcome};
pub use session::{ChatTurn, Role, Session};
pub use tool::ToolDescriptor;
