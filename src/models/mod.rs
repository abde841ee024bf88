//! Data Models
//!
//! ## Module Organization
//!
//! - `task` - Planned task model (`Todo`, `TaskStatus`)
//! - `decision` - Structured decisions decoded from model output
//! - `provider` - Tool provider descriptors

pub mod decision;
pub mod provider;
pub mod task;

pub use decision::{decode_decision, AgentMeta, PlannerDecision, TaskVerdict, VerifierDecision};
pub use provider::{ToolInfo, ToolProviderInfo};
pub use task::{TaskStatus, Todo};
