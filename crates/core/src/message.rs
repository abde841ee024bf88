//! Conversation Message Model
//!
//! The unit of exchange between the user, the model, and tools. Assistant
//! messages are created empty when a turn begins, mutated in place while the
//! turn streams, and frozen when the terminal stream event arrives. Tool-role
//! messages are created once, after a tool call resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message role within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// Which pipeline role produced an assistant message.
///
/// Presentation tag only: the orchestrator never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Executor,
    Verifier,
}

/// What an assistant message was doing when it was produced.
///
/// Presentation tag only, like [`AgentRole`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    Thinking,
    Planning,
    CallingTool,
    Exploring,
    Verifying,
    Summarizing,
}

/// Function descriptor inside a tool call: name plus JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    /// JSON-encoded argument object as emitted by the model. May be malformed;
    /// dispatch degrades malformed arguments to an empty object.
    pub arguments: String,
}

/// A tool call proposed by the model.
///
/// Consumed exactly once: executed automatically, executed after human
/// confirmation, or discarded on cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Fixed type tag, "function" for all current backends.
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ToolFunction,
}

impl ToolCall {
    pub fn function_call(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Stable identifier, unique within the conversation
    pub id: String,
    pub role: Role,
    /// Text content. Mutable while the owning turn streams, frozen afterwards.
    pub content: String,
    /// Reasoning trace. Omitted entirely when blank so partial thinking noise
    /// never surfaces as a real trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Tool calls proposed by this assistant message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Tool calls awaiting human confirmation. Disjoint from `tool_calls`
    /// once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_tool_calls: Option<Vec<ToolCall>>,
    /// Back-reference to the tool call this tool-role message answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name, for tool-role messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Presentation tag: which pipeline role produced this message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<AgentRole>,
    /// Presentation tag: what the message was doing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_action: Option<AgentAction>,
}

impl ConversationMessage {
    fn base(id: String, role: Role, content: String) -> Self {
        Self {
            id,
            role,
            content,
            reasoning: None,
            tool_calls: None,
            pending_tool_calls: None,
            tool_call_id: None,
            name: None,
            created_at: Utc::now(),
            agent_role: None,
            agent_action: None,
        }
    }

    /// Create a user message with a generated id.
    pub fn user(content: impl Into<String>) -> Self {
        Self::base(Uuid::new_v4().to_string(), Role::User, content.into())
    }

    /// Create a user message with an explicit id (round-scoped ids in the
    /// orchestrators).
    pub fn user_with_id(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::base(id.into(), Role::User, content.into())
    }

    /// Create an empty assistant message for a turn that is about to stream.
    pub fn assistant_placeholder(id: impl Into<String>) -> Self {
        Self::base(id.into(), Role::Assistant, String::new())
    }

    /// Create a tool-role message carrying one resolved tool call result.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::base(Uuid::new_v4().to_string(), Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(tool_name.into());
        msg
    }

    /// Attach presentation tags.
    pub fn with_tags(mut self, role: Option<AgentRole>, action: Option<AgentAction>) -> Self {
        self.agent_role = role;
        self.agent_action = action;
        self
    }
}
