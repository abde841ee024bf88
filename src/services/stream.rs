//! Stream Consumer
//!
//! Performs one model turn: subscribes to the turn's event channel before the
//! completion request is issued, folds `content` / `tool_calls` / `reasoning`
//! fragments into the live assistant message, and resolves exactly once on
//! the terminal event. A user stop surfaces as the distinguished
//! `AgentError::Stopped`, never as a generic failure. The subscription is
//! torn down on every exit path, including when the request itself fails
//! before any event arrives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use taskweave_core::{
    AgentAction, AgentRole, ConversationMessage, StreamEvent, ToolCall,
};

use crate::models::ToolInfo;
use crate::services::backend::{persist_message, CompletionBackend, CompletionRequest, MessageStore};
use crate::services::conversation::ConversationHandle;
use crate::utils::{AgentError, AgentResult};

/// Input for one model turn. The turn id doubles as the id of the live
/// assistant message appended to the conversation.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub turn_id: String,
    pub tools: Option<Vec<ToolInfo>>,
    pub system_prompt: String,
    pub agent_role: Option<AgentRole>,
    pub agent_action: Option<AgentAction>,
}

/// Accumulated result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Omitted entirely when the accumulated trace is blank
    pub reasoning: Option<String>,
}

pub struct StreamConsumer {
    backend: Arc<dyn CompletionBackend>,
    store: Arc<dyn MessageStore>,
}

impl StreamConsumer {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: Arc<dyn MessageStore>) -> Self {
        Self { backend, store }
    }

    /// Run one model turn against the conversation.
    ///
    /// The transcript sent to the backend is the conversation snapshot taken
    /// before the live assistant placeholder is appended. Turns are strictly
    /// sequential per conversation; callers never overlap two turns.
    pub async fn run_turn(
        &self,
        conversation: &ConversationHandle,
        input: TurnInput,
        cancel: &CancellationToken,
    ) -> AgentResult<TurnOutcome> {
        let turn_id = input.turn_id.clone();

        // Subscribe before the request goes out so the first fragment cannot
        // race past a missing listener.
        let mut rx = self.backend.subscribe(&turn_id).await?;

        let transcript = conversation.snapshot().await;
        let placeholder = ConversationMessage::assistant_placeholder(&turn_id)
            .with_tags(input.agent_role, input.agent_action);
        conversation.push(placeholder).await;

        let request = CompletionRequest {
            conversation_id: conversation.conversation_id().to_string(),
            messages: transcript,
            tools: input.tools,
            system_prompt: input.system_prompt,
            turn_id: turn_id.clone(),
        };
        if let Err(e) = self.backend.start_completion(request).await {
            // rx is dropped here, tearing the subscription down.
            return Err(e);
        }

        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut reasoning = String::new();
        let mut cancel_requested = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled(), if !cancel_requested => {
                    debug!(%turn_id, "cancelling in-flight turn");
                    cancel_requested = true;
                    if let Err(e) = self.backend.cancel(&turn_id).await {
                        warn!(%turn_id, error = %e, "cancel request failed");
                    }
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        if cancel_requested {
                            return Err(AgentError::Stopped);
                        }
                        return Err(AgentError::backend("stream closed before terminal event"));
                    };
                    match event {
                        StreamEvent::Content { content: delta } => {
                            content.push_str(&delta);
                            conversation.append_content(&turn_id, &delta).await;
                        }
                        StreamEvent::Reasoning { content: delta } => {
                            reasoning.push_str(&delta);
                            conversation.append_reasoning(&turn_id, &delta).await;
                        }
                        StreamEvent::ToolCalls { tool_calls: calls } => {
                            tool_calls.extend(calls.iter().cloned());
                            conversation.extend_tool_calls(&turn_id, calls).await;
                        }
                        StreamEvent::Done => {
                            if cancel_requested {
                                // The backend raced our cancel with its own
                                // completion; the user asked to stop.
                                self.persist_partial(conversation, &turn_id).await;
                                return Err(AgentError::Stopped);
                            }
                            return self
                                .finalize(conversation, &turn_id, content, tool_calls, reasoning)
                                .await;
                        }
                        StreamEvent::Stopped => {
                            self.persist_partial(conversation, &turn_id).await;
                            return Err(AgentError::Stopped);
                        }
                        StreamEvent::Error { message } => {
                            return Err(AgentError::backend(message));
                        }
                    }
                }
            }
        }
    }

    async fn finalize(
        &self,
        conversation: &ConversationHandle,
        turn_id: &str,
        content: String,
        tool_calls: Vec<ToolCall>,
        reasoning: String,
    ) -> AgentResult<TurnOutcome> {
        // Partial thinking noise must not surface as a real reasoning trace.
        let reasoning = if reasoning.trim().is_empty() {
            conversation.mutate(turn_id, |m| m.reasoning = None).await;
            None
        } else {
            Some(reasoning)
        };

        self.persist_partial(conversation, turn_id).await;

        Ok(TurnOutcome {
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            reasoning,
        })
    }

    /// Persist the message in whatever state it is in. A stop mid-turn keeps
    /// the partial message as-is.
    async fn persist_partial(&self, conversation: &ConversationHandle, turn_id: &str) {
        if let Some(message) = conversation.get(turn_id).await {
            persist_message(self.store.as_ref(), &message, conversation.conversation_id()).await;
        }
    }
}
