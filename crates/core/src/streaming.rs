//! Turn Stream Event Types
//!
//! Event types delivered on a turn-scoped channel while a model completion is
//! streaming. These types are shared between backend implementations (which
//! emit them) and the orchestration crate (which consumes them).
//!
//! Ordering contract per turn: zero or more `content` / `tool_calls` /
//! `reasoning` events, followed by exactly one terminal event (`done`,
//! `stopped`, or `error`). No events are delivered after the terminal event.

use serde::{Deserialize, Serialize};

use crate::message::ToolCall;

/// A single event on a turn's stream channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text content fragment from the model
    Content { content: String },

    /// Tool calls proposed by the model (delivered as a complete set)
    ToolCalls { tool_calls: Vec<ToolCall> },

    /// Reasoning/thinking content fragment
    Reasoning { content: String },

    /// Turn completed normally
    Done,

    /// Turn was stopped by the user. Not a fault: consumers surface this as a
    /// distinguished stop, never as a generic error.
    Stopped,

    /// Turn failed with a backend/transport error
    Error { message: String },
}

impl StreamEvent {
    /// Whether this event terminates the turn's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Done | StreamEvent::Stopped | StreamEvent::Error { .. }
        )
    }
}
