//! Tool Dispatch & Confirmation Policy
//!
//! Classifies proposed tool calls as auto-executable or needing human
//! confirmation, executes them against the tool backend, and folds the
//! results back into the conversation as tool-role messages. Per-call
//! failures are surfaced as visible error results without aborting sibling
//! calls.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use taskweave_core::{ConversationMessage, ToolCall};

use crate::services::backend::{persist_message, MessageStore, ToolBackend};
use crate::services::conversation::ConversationHandle;
use crate::services::registry::ToolProviderRegistry;
use crate::utils::AgentResult;

/// Outcome of classifying a set of proposed tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Every call resolves to a default provider; run unattended.
    AutoExecute,
    /// At least one call needs human confirmation; execution halts.
    NeedsConfirmation,
}

pub struct ToolDispatcher {
    registry: Arc<ToolProviderRegistry>,
    backend: Arc<dyn ToolBackend>,
    store: Arc<dyn MessageStore>,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<ToolProviderRegistry>,
        backend: Arc<dyn ToolBackend>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry,
            backend,
            store,
        }
    }

    pub fn classify(&self, calls: &[ToolCall]) -> DispatchDecision {
        if self.registry.all_default(calls) {
            DispatchDecision::AutoExecute
        } else {
            DispatchDecision::NeedsConfirmation
        }
    }

    /// Execute calls one at a time, appending a tool-role message per call.
    /// Never fails as a whole: a failing call yields an error-text result and
    /// the remaining calls still run.
    pub async fn execute_calls(
        &self,
        conversation: &ConversationHandle,
        calls: &[ToolCall],
    ) -> AgentResult<()> {
        for call in calls {
            let content = self.execute_one(conversation, call).await;
            let message =
                ConversationMessage::tool_result(&call.id, &call.function.name, content);
            persist_message(
                self.store.as_ref(),
                &message,
                conversation.conversation_id(),
            )
            .await;
            conversation.push(message).await;
        }
        Ok(())
    }

    /// Confirmation path: move the assistant message's pending calls into its
    /// confirmed `tool_calls`, then replay the normal execution path.
    pub async fn confirm_pending(
        &self,
        conversation: &ConversationHandle,
        assistant_id: &str,
    ) -> AgentResult<Vec<ToolCall>> {
        let mut confirmed: Vec<ToolCall> = Vec::new();
        conversation
            .mutate(assistant_id, |m| {
                if let Some(pending) = m.pending_tool_calls.take() {
                    m.tool_calls.get_or_insert_with(Vec::new).extend(pending.iter().cloned());
                    confirmed = pending;
                }
            })
            .await;
        if !confirmed.is_empty() {
            self.execute_calls(conversation, &confirmed).await?;
        }
        Ok(confirmed)
    }

    async fn execute_one(&self, conversation: &ConversationHandle, call: &ToolCall) -> String {
        let tool_name = &call.function.name;
        let Some(provider) = self.registry.find_provider(tool_name) else {
            warn!(%tool_name, "tool call targets no available provider");
            return format!("Error: tool '{tool_name}' is not available");
        };

        // Malformed argument strings degrade to an empty object instead of
        // aborting the call.
        let args: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!(%tool_name, error = %e, "malformed tool arguments, using empty object");
                json!({})
            }
        };

        debug!(%tool_name, provider = %provider.key, "executing tool call");
        let hints = json!({ "conversation_id": conversation.conversation_id() });
        match self
            .backend
            .execute(&provider.key, tool_name, args, hints)
            .await
        {
            Ok(result) => match result {
                Value::String(s) => s,
                other => other.to_string(),
            },
            Err(e) => {
                warn!(%tool_name, error = %e, "tool call failed");
                format!("Error: {e}")
            }
        }
    }
}
