//! Orchestration Services
//!
//! ## Module Organization
//!
//! - `backend` - Consumed interfaces: completion stream, tool execution,
//!   persistence
//! - `conversation` - Single-owner conversation state with snapshot updates
//! - `stream` - One-turn stream consumer
//! - `registry` - Tool provider registry and default-provider classification
//! - `dispatch` - Tool dispatch and the confirmation policy
//! - `prompts` - Role framing and decision extraction helpers
//! - `pipeline` - Planner/executor/verifier workflow
//! - `react` - Single-agent thought/action/observation loop

pub mod backend;
pub mod conversation;
pub mod dispatch;
pub mod pipeline;
pub mod prompts;
pub mod react;
pub mod registry;
pub mod stream;

pub use backend::{CompletionBackend, CompletionRequest, MessageStore, ToolBackend};
pub use conversation::{ConversationHandle, ErrorFn, LogFn, RunCallbacks, UpdateFn};
pub use dispatch::{DispatchDecision, ToolDispatcher};
pub use pipeline::{AgentWorkflow, RunStatus, WorkflowOptions, WorkflowReport};
pub use react::{ReActLoop, ReActOptions, ReActReport, ReActStatus};
pub use registry::ToolProviderRegistry;
pub use stream::{StreamConsumer, TurnInput, TurnOutcome};
