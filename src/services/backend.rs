//! Consumed Backend Interfaces
//!
//! The orchestration core talks to the outside world through three narrow
//! traits: a model-completion-and-stream backend, a tool-execution backend,
//! and a message store. Hosts implement these over whatever transport they
//! use; tests implement them with scripted mocks.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use taskweave_core::{ConversationMessage, StreamEvent};

use crate::models::ToolInfo;
use crate::utils::AgentResult;

/// One model-completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub conversation_id: String,
    /// Full transcript for this turn, oldest first
    pub messages: Vec<ConversationMessage>,
    /// Tool declarations to expose, `None` for a no-tools turn
    pub tools: Option<Vec<ToolInfo>>,
    pub system_prompt: String,
    /// Names the event channel the response streams on
    pub turn_id: String,
}

/// Model-completion-and-stream backend.
///
/// Callers must `subscribe` before `start_completion` for the same turn id,
/// otherwise the first fragments can be emitted before a listener exists.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open the event channel for a turn.
    async fn subscribe(&self, turn_id: &str) -> AgentResult<mpsc::Receiver<StreamEvent>>;

    /// Issue the completion request. Events arrive on the subscribed channel.
    async fn start_completion(&self, request: CompletionRequest) -> AgentResult<()>;

    /// Abort an in-flight turn. The backend answers with a terminal event.
    async fn cancel(&self, turn_id: &str) -> AgentResult<()>;
}

/// Tool-execution backend. One call per proposed tool call; failures are
/// caught per call by the dispatcher and never abort sibling calls.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn execute(
        &self,
        provider_key: &str,
        tool_name: &str,
        args: Value,
        context_hints: Value,
    ) -> AgentResult<Value>;
}

/// Persistence collaborator. Fire-and-forget from the orchestrator's
/// perspective: failures are logged and never block the loop.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(
        &self,
        message: &ConversationMessage,
        conversation_id: &str,
    ) -> AgentResult<()>;
}

/// Persist a message, logging instead of propagating on failure.
pub(crate) async fn persist_message(
    store: &dyn MessageStore,
    message: &ConversationMessage,
    conversation_id: &str,
) {
    if let Err(e) = store.save_message(message, conversation_id).await {
        tracing::warn!(
            message_id = %message.id,
            error = %e,
            "failed to persist message"
        );
    }
}
