//! Conversation State
//!
//! The message history is the one piece of mutable shared state in a run.
//! `ConversationHandle` is its single owner: every mutation, whether from the
//! stream callback or from an orchestrator loop, funnels through one
//! mutex-guarded cell, and every mutation delivers the full ordered snapshot
//! to the `on_update` callback. Callers must treat re-delivery of an
//! unchanged snapshot as a no-op.

use std::sync::Arc;

use tokio::sync::Mutex;

use taskweave_core::{AgentAction, AgentRole, ConversationMessage, ToolCall};

use crate::utils::AgentError;

/// Full-snapshot update callback, invoked after every mutation.
pub type UpdateFn = Arc<dyn Fn(&[ConversationMessage]) + Send + Sync>;
/// Progress log callback.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;
/// Error surface callback.
pub type ErrorFn = Arc<dyn Fn(&AgentError) + Send + Sync>;

/// Optional presentation callbacks for a run.
#[derive(Clone, Default)]
pub struct RunCallbacks {
    pub on_log: Option<LogFn>,
    pub on_error: Option<ErrorFn>,
}

impl RunCallbacks {
    pub fn log(&self, message: &str) {
        if let Some(cb) = &self.on_log {
            cb(message);
        }
    }

    pub fn error(&self, error: &AgentError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }
}

/// Single owner of a conversation's message history.
pub struct ConversationHandle {
    conversation_id: String,
    messages: Mutex<Vec<ConversationMessage>>,
    on_update: UpdateFn,
}

impl ConversationHandle {
    pub fn new(
        conversation_id: impl Into<String>,
        initial: Vec<ConversationMessage>,
        on_update: UpdateFn,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Mutex::new(initial),
            on_update,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Append a message and notify.
    pub async fn push(&self, message: ConversationMessage) {
        let mut guard = self.messages.lock().await;
        guard.push(message);
        self.notify(&guard);
    }

    /// Mutate a message by id and notify. Unknown ids are ignored; the
    /// message may already have been replaced by a newer turn.
    pub async fn mutate<F>(&self, id: &str, f: F)
    where
        F: FnOnce(&mut ConversationMessage),
    {
        let mut guard = self.messages.lock().await;
        if let Some(msg) = guard.iter_mut().find(|m| m.id == id) {
            f(msg);
            self.notify(&guard);
        }
    }

    /// Clone the full ordered history.
    pub async fn snapshot(&self) -> Vec<ConversationMessage> {
        self.messages.lock().await.clone()
    }

    /// Clone one message by id.
    pub async fn get(&self, id: &str) -> Option<ConversationMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub async fn append_content(&self, id: &str, delta: &str) {
        self.mutate(id, |m| m.content.push_str(delta)).await;
    }

    pub async fn append_reasoning(&self, id: &str, delta: &str) {
        self.mutate(id, |m| {
            m.reasoning.get_or_insert_with(String::new).push_str(delta)
        })
        .await;
    }

    pub async fn extend_tool_calls(&self, id: &str, calls: Vec<ToolCall>) {
        self.mutate(id, |m| {
            m.tool_calls.get_or_insert_with(Vec::new).extend(calls)
        })
        .await;
    }

    pub async fn set_pending_tool_calls(&self, id: &str, calls: Option<Vec<ToolCall>>) {
        self.mutate(id, |m| m.pending_tool_calls = calls).await;
    }

    pub async fn set_tags(&self, id: &str, role: Option<AgentRole>, action: Option<AgentAction>) {
        self.mutate(id, |m| {
            m.agent_role = role;
            m.agent_action = action;
        })
        .await;
    }

    fn notify(&self, messages: &[ConversationMessage]) {
        (self.on_update)(messages);
    }
}
