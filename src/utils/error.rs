//! Error Handling
//!
//! Unified error types for the orchestration crate.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use taskweave_core::CoreError;

/// Orchestration-level error type.
///
/// `Stopped` is deliberately its own variant: a user-triggered stop is not a
/// fault, and callers suppress it from user-facing error surfaces.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The user stopped the turn or loop. Short-circuits cleanly.
    #[error("stopped by user")]
    Stopped,

    /// The completion backend failed (transport, provider, stream error).
    /// Fatal to the current turn; no automatic retry.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A tool call failed. Caught per call and surfaced as a notice;
    /// sibling calls keep running.
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Core errors
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for orchestration errors
pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the distinguished user-stop, which callers
    /// treat as normal termination.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}
