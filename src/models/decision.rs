//! Structured Decisions Extracted from Model Turns
//!
//! These types are the decode targets of the partial-JSON extractor: every
//! field is default-tolerant so a still-streaming or truncated object decodes
//! into whatever fields are already unambiguous. A decision that fails to
//! decode means "no decision yet", never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use taskweave_core::parse_partial_json;

use crate::models::task::Todo;

/// Planner round output: new tasks plus whether more planning is wanted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerDecision {
    #[serde(default)]
    pub needs_more_planning: bool,
    #[serde(default)]
    pub todos: Vec<Todo>,
}

/// Verifier verdict for one task.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskVerdict {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Verifier turn output over the whole task list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierDecision {
    #[serde(default)]
    pub all_completed: bool,
    #[serde(default)]
    pub tasks: Vec<TaskVerdict>,
    #[serde(default)]
    pub overall_feedback: Option<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// Per-iteration decision of the single-agent loop.
///
/// `next_action` is a tool name, or one of `answer` / `analyze` for turns
/// that should run without tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMeta {
    #[serde(default)]
    pub should_continue: bool,
    #[serde(default)]
    pub next_action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Decode a decision type from free-form model text via partial-JSON
/// extraction. Returns `None` when no object could be recovered at all or
/// the recovered object does not fit `T`; callers treat that as "no
/// decision", ending the owning phase gracefully.
pub fn decode_decision<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let partial = parse_partial_json(text);
    if !partial.is_valid && partial.data == Value::Object(Default::default()) {
        return None;
    }
    serde_json::from_value(partial.data).ok()
}
