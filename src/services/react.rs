//! Single-Agent Reasoning Loop
//!
//! Thought → action → observation, repeated up to an iteration cap. Each
//! thought turn must end with an `<agent_meta>` decision envelope; a missing
//! or unparseable envelope means the answer was already given and the loop
//! ends. Tool calls that are not all auto-executable pause the loop until
//! [`ReActLoop::continue_after_confirmation`].

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use taskweave_core::{AgentAction, ConversationMessage};

use crate::services::conversation::{ConversationHandle, RunCallbacks};
use crate::services::dispatch::{DispatchDecision, ToolDispatcher};
use crate::services::prompts;
use crate::services::registry::ToolProviderRegistry;
use crate::services::stream::{StreamConsumer, TurnInput, TurnOutcome};
use crate::utils::{AgentError, AgentResult};

/// How a reasoning run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReActStatus {
    /// A direct answer was produced
    Answered,
    /// Halted awaiting human confirmation of tool calls
    Paused,
    /// The user stopped the run
    Stopped,
    /// The iteration cap was reached; a warning, not an error
    IterationCapReached,
}

#[derive(Debug, Clone)]
pub struct ReActReport {
    pub status: ReActStatus,
    pub iterations: usize,
    pub final_answer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReActOptions {
    pub request: String,
    pub max_iterations: usize,
}

impl ReActOptions {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            max_iterations: 10,
        }
    }
}

struct PausedLoop {
    request: String,
    iteration: usize,
    max_iterations: usize,
    turn_id: String,
}

pub struct ReActLoop {
    conversation: Arc<ConversationHandle>,
    consumer: StreamConsumer,
    dispatcher: ToolDispatcher,
    registry: Arc<ToolProviderRegistry>,
    callbacks: RunCallbacks,
    cancel: StdMutex<CancellationToken>,
    paused: Mutex<Option<PausedLoop>>,
}

impl ReActLoop {
    pub fn new(
        conversation: Arc<ConversationHandle>,
        consumer: StreamConsumer,
        dispatcher: ToolDispatcher,
        registry: Arc<ToolProviderRegistry>,
        callbacks: RunCallbacks,
    ) -> Self {
        Self {
            conversation,
            consumer,
            dispatcher,
            registry,
            callbacks,
            cancel: StdMutex::new(CancellationToken::new()),
            paused: Mutex::new(None),
        }
    }

    /// Stop the loop: checked between every stage, and aborts any in-flight
    /// model turn. A stop is normal termination, not a reportable error.
    pub fn stop(&self) {
        if let Ok(guard) = self.cancel.lock() {
            guard.cancel();
        }
    }

    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut guard) = self.cancel.lock() {
            *guard = token.clone();
        }
        token
    }

    pub async fn run(&self, options: ReActOptions) -> AgentResult<ReActReport> {
        let cancel = self.fresh_token();
        self.conversation
            .push(ConversationMessage::user(&options.request))
            .await;
        self.iterate(&options.request, 0, options.max_iterations, &cancel)
            .await
    }

    /// Execute the confirmed pending tool calls, fold in an observation, and
    /// resume the paused loop.
    pub async fn continue_after_confirmation(&self) -> AgentResult<ReActReport> {
        let Some(state) = self.paused.lock().await.take() else {
            return Err(AgentError::internal("no paused loop to confirm"));
        };
        let cancel = self.fresh_token();
        let confirmed = self
            .dispatcher
            .confirm_pending(&self.conversation, &state.turn_id)
            .await?;
        if !confirmed.is_empty() {
            if let Err(e) = self.observe(&cancel).await {
                return self.handle_turn_error(e, state.iteration);
            }
        }
        self.iterate(
            &state.request,
            state.iteration + 1,
            state.max_iterations,
            &cancel,
        )
        .await
    }

    async fn iterate(
        &self,
        request: &str,
        start_iteration: usize,
        max_iterations: usize,
        cancel: &CancellationToken,
    ) -> AgentResult<ReActReport> {
        for iteration in start_iteration..max_iterations {
            if cancel.is_cancelled() {
                return Ok(self.report(ReActStatus::Stopped, iteration, None));
            }
            debug!(iteration, "reasoning iteration");

            // Thought
            self.conversation
                .push(ConversationMessage::user(prompts::thought_user_message(
                    request, iteration,
                )))
                .await;
            let (thought_id, thought) = match self
                .turn(prompts::react_system_prompt(), false, AgentAction::Thinking, cancel)
                .await
            {
                Ok(r) => r,
                Err(e) => return self.handle_turn_error(e, iteration),
            };

            let cleaned = prompts::remove_agent_meta(&thought.content);
            if cleaned != thought.content {
                let visible = cleaned.clone();
                self.conversation
                    .mutate(&thought_id, move |m| m.content = visible)
                    .await;
            }

            let Some(meta) = prompts::extract_agent_meta(&thought.content) else {
                // No decision means the answer was already given.
                debug!(iteration, "no decision envelope, treating thought as answer");
                return Ok(self.report(ReActStatus::Answered, iteration + 1, Some(cleaned)));
            };
            if !meta.should_continue {
                return Ok(self.report(ReActStatus::Answered, iteration + 1, Some(cleaned)));
            }

            if cancel.is_cancelled() {
                return Ok(self.report(ReActStatus::Stopped, iteration, None));
            }

            // Action
            let tool_turn = self.registry.has_tool(&meta.next_action);
            let action_tag = if tool_turn {
                AgentAction::CallingTool
            } else {
                AgentAction::Exploring
            };
            self.conversation
                .push(ConversationMessage::user(prompts::action_user_message(&meta)))
                .await;
            let tools = self.registry.available_tools();
            let system = prompts::base_system_prompt(&tools);
            let (action_id, action) = match self.turn(system, tool_turn, action_tag, cancel).await {
                Ok(r) => r,
                Err(e) => return self.handle_turn_error(e, iteration),
            };

            let Some(calls) = action.tool_calls.filter(|c| !c.is_empty()) else {
                // A turn with no tool calls is a direct answer.
                return Ok(self.report(
                    ReActStatus::Answered,
                    iteration + 1,
                    Some(action.content),
                ));
            };

            match self.dispatcher.classify(&calls) {
                DispatchDecision::NeedsConfirmation => {
                    self.conversation
                        .set_pending_tool_calls(&action_id, Some(calls))
                        .await;
                    self.callbacks.log("Tool calls are awaiting confirmation.");
                    *self.paused.lock().await = Some(PausedLoop {
                        request: request.to_string(),
                        iteration,
                        max_iterations,
                        turn_id: action_id,
                    });
                    return Ok(self.report(ReActStatus::Paused, iteration, None));
                }
                DispatchDecision::AutoExecute => {
                    self.dispatcher
                        .execute_calls(&self.conversation, &calls)
                        .await?;
                    if let Err(e) = self.observe(cancel).await {
                        return self.handle_turn_error(e, iteration);
                    }
                }
            }
        }

        warn!(max_iterations, "iteration cap reached");
        self.callbacks
            .log("Reasoning stopped at the iteration cap without a final answer.");
        Ok(self.report(ReActStatus::IterationCapReached, max_iterations, None))
    }

    /// Observation: one summarizing turn folding fresh tool results into the
    /// conversation before the next thought.
    async fn observe(&self, cancel: &CancellationToken) -> AgentResult<()> {
        self.conversation
            .push(ConversationMessage::user(prompts::observation_user_message()))
            .await;
        self.turn(
            prompts::base_system_prompt(&[]),
            false,
            AgentAction::Summarizing,
            cancel,
        )
        .await?;
        Ok(())
    }

    fn handle_turn_error(
        &self,
        error: AgentError,
        iteration: usize,
    ) -> AgentResult<ReActReport> {
        if error.is_stopped() {
            return Ok(self.report(ReActStatus::Stopped, iteration, None));
        }
        self.callbacks.error(&error);
        Err(error)
    }

    fn report(
        &self,
        status: ReActStatus,
        iterations: usize,
        final_answer: Option<String>,
    ) -> ReActReport {
        ReActReport {
            status,
            iterations,
            final_answer,
        }
    }

    async fn turn(
        &self,
        system_prompt: String,
        with_tools: bool,
        action: AgentAction,
        cancel: &CancellationToken,
    ) -> AgentResult<(String, TurnOutcome)> {
        let turn_id = Uuid::new_v4().to_string();
        let input = TurnInput {
            turn_id: turn_id.clone(),
            tools: with_tools.then(|| self.registry.available_tools()),
            system_prompt,
            agent_role: None,
            agent_action: Some(action),
        };
        let outcome = self
            .consumer
            .run_turn(&self.conversation, input, cancel)
            .await?;
        Ok((turn_id, outcome))
    }
}
