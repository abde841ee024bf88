//! Taskweave
//!
//! Orchestration core for language-model agents: bounded multi-role
//! workflows, a single-agent reasoning loop, incremental parsing of streamed
//! structured output, and a tool dispatch policy with human confirmation for
//! untrusted providers.
//!
//! The crate owns the orchestration state machines only. The model
//! transport, tool processes, and persistence are consumed through the
//! traits in [`services::backend`]; the host feeds conversation updates to
//! its UI through the snapshot callback on
//! [`services::conversation::ConversationHandle`].
//!
//! ## Module Organization
//!
//! - `models` - Tasks, decisions, tool providers
//! - `services` - Stream consumer, dispatch, orchestrators
//! - `utils` - Error types
//!
//! Foundational message and stream-event types live in `taskweave-core`.

pub mod models;
pub mod services;
pub mod utils;

pub use taskweave_core::{
    AgentAction, AgentRole, ConversationMessage, Role, StreamEvent, ToolCall, ToolFunction,
};

pub use models::{AgentMeta, PlannerDecision, TaskStatus, TaskVerdict, Todo, ToolInfo,
    ToolProviderInfo, VerifierDecision};
pub use services::{
    AgentWorkflow, CompletionBackend, CompletionRequest, ConversationHandle, MessageStore,
    ReActLoop, ReActOptions, ReActReport, ReActStatus, RunCallbacks, RunStatus, StreamConsumer,
    ToolBackend, ToolDispatcher, ToolProviderRegistry, TurnInput, TurnOutcome, WorkflowOptions,
    WorkflowReport,
};
pub use utils::{AgentError, AgentResult};
