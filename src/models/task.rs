//! Planned Task Model
//!
//! Tasks are produced by the planner, owned by the workflow for the duration
//! of one run, and executed strictly in priority order.

use serde::{Deserialize, Serialize};

/// Task lifecycle status.
///
/// Transitions within one execution attempt are monotonic:
/// pending → executing → {completed | failed}. A task that leaves `Executing`
/// is never revisited; a fresh planning round appends a new task instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

/// A unit of planned work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    /// Model-assigned identifier, unique within a planning cycle
    pub id: String,
    pub description: String,
    /// Lower value runs first
    pub priority: i64,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    /// Final free-text result, set when the task completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Marks the task currently being executed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_current: bool,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl Todo {
    pub fn new(id: impl Into<String>, description: impl Into<String>, priority: i64) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority,
            status: TaskStatus::Pending,
            result: None,
            is_current: false,
        }
    }

    /// Whether the task has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}
