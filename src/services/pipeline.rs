//! Role-Pipeline Orchestrator
//!
//! Drives the planner → executor → verifier state machine. Each phase is a
//! bounded loop of model turns over the shared conversation:
//!
//! - planning appends tasks, at most three rounds, with a stall guard
//! - execution runs tasks strictly in ascending priority order, at most ten
//!   rounds each, dispatching tool calls between rounds
//! - verification renders a verdict and, when everything passed, a final
//!   summary turn that becomes the user-facing answer
//!
//! A run pauses when proposed tool calls need human confirmation and resumes
//! through [`AgentWorkflow::confirm_pending`]. `stop()` cancels cooperatively
//! between rounds and aborts any in-flight turn.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use taskweave_core::{AgentAction, AgentRole, ConversationMessage};

use crate::models::{
    decode_decision, PlannerDecision, TaskStatus, TaskVerdict, Todo, VerifierDecision,
};
use crate::services::conversation::{ConversationHandle, RunCallbacks};
use crate::services::dispatch::{DispatchDecision, ToolDispatcher};
use crate::services::prompts;
use crate::services::registry::ToolProviderRegistry;
use crate::services::stream::{StreamConsumer, TurnInput, TurnOutcome};
use crate::utils::{AgentError, AgentResult};

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// All phases ran to their natural end
    Completed,
    /// Halted awaiting human confirmation of tool calls
    Paused,
    /// The user stopped the run
    Stopped,
}

/// Final state of one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub status: RunStatus,
    pub tasks: Vec<Todo>,
    pub all_completed: bool,
    pub verdicts: Vec<TaskVerdict>,
    pub overall_feedback: Option<String>,
    /// Surfaced for the caller to consume; this core does not act on them
    pub improvements: Vec<String>,
    /// User-facing answer from the summary turn, when verification passed
    pub summary: Option<String>,
}

impl WorkflowReport {
    fn halted(status: RunStatus, tasks: Vec<Todo>) -> Self {
        Self {
            status,
            tasks,
            all_completed: false,
            verdicts: Vec::new(),
            overall_feedback: None,
            improvements: Vec::new(),
            summary: None,
        }
    }
}

/// Options for one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub request: String,
    pub max_planning_rounds: usize,
    pub max_execution_rounds: usize,
}

impl WorkflowOptions {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            max_planning_rounds: 3,
            max_execution_rounds: 10,
        }
    }
}

/// State saved when execution pauses for confirmation.
struct PausedPipeline {
    request: String,
    tasks: Vec<Todo>,
    task_index: usize,
    turn_id: String,
    max_execution_rounds: usize,
}

pub struct AgentWorkflow {
    conversation: Arc<ConversationHandle>,
    consumer: StreamConsumer,
    dispatcher: ToolDispatcher,
    registry: Arc<ToolProviderRegistry>,
    callbacks: RunCallbacks,
    cancel: StdMutex<CancellationToken>,
    paused: Mutex<Option<PausedPipeline>>,
}

impl AgentWorkflow {
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

    /// Stop the run: checked at the top of every round, and aborts any
    /// in-flight model turn.
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

    /// Run the full pipeline for one user request.
    pub async fn run(&self, options: WorkflowOptions) -> AgentResult<WorkflowReport> {
        let cancel = self.fresh_token();
        self.conversation
            .push(ConversationMessage::user(&options.request))
            .await;

        let mut tasks = match self.planning_phase(&options, &cancel).await {
            Ok(tasks) => tasks,
            // A stop mid-planning still reports whatever the earlier rounds
            // planned.
            Err((e, tasks)) if e.is_stopped() => {
                return Ok(WorkflowReport::halted(RunStatus::Stopped, tasks))
            }
            Err((e, _)) => {
                self.callbacks.error(&e);
                return Err(e);
            }
        };

        if tasks.is_empty() {
            info!("planning produced no tasks, ending run");
            self.callbacks.log("No tasks were planned.");
            return Ok(WorkflowReport::halted(RunStatus::Completed, tasks));
        }

        // Lower priority value runs first; stable for equal priorities.
        tasks.sort_by_key(|t| t.priority);

        self.execute_and_verify(
            &options.request,
            tasks,
            0,
            options.max_execution_rounds,
            &cancel,
        )
        .await
    }

    /// Execute the confirmed pending tool calls and resume the paused run.
    /// The in-flight task restarts its round count.
    pub async fn confirm_pending(&self) -> AgentResult<WorkflowReport> {
        let Some(state) = self.paused.lock().await.take() else {
            return Err(AgentError::internal("no paused workflow to confirm"));
        };
        let cancel = self.fresh_token();
        self.dispatcher
            .confirm_pending(&self.conversation, &state.turn_id)
            .await?;
        self.execute_and_verify(
            &state.request,
            state.tasks,
            state.task_index,
            state.max_execution_rounds,
            &cancel,
        )
        .await
    }

    async fn planning_phase(
        &self,
        options: &WorkflowOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Todo>, (AgentError, Vec<Todo>)> {
        let mut tasks: Vec<Todo> = Vec::new();

        for round in 0..options.max_planning_rounds {
            if cancel.is_cancelled() {
                return Err((AgentError::Stopped, tasks));
            }
            debug!(round, "planning round");
            self.conversation
                .push(ConversationMessage::user_with_id(
                    format!("plan-user-{round}"),
                    prompts::planner_user_message(round, &options.request, &tasks),
                ))
                .await;

            let (_, outcome) = self
                .role_turn(
                    prompts::planner_system_prompt(),
                    false,
                    AgentRole::Planner,
                    AgentAction::Planning,
                    cancel,
                )
                .await
                .map_err(|e| (e, tasks.clone()))?;

            let Some(decision) = decode_decision::<PlannerDecision>(&outcome.content) else {
                debug!(round, "no parseable planning decision, stopping planning");
                break;
            };

            let before = tasks.len();
            for todo in decision.todos {
                if !tasks.iter().any(|t| t.id == todo.id) {
                    tasks.push(todo);
                }
            }
            let added = tasks.len() - before;
            self.callbacks
                .log(&format!("Planning round {} added {added} task(s)", round + 1));

            if added == 0 && decision.needs_more_planning {
                // A stalled model asking for more rounds without producing
                // anything would loop to the cap otherwise.
                warn!(round, "planner requested more rounds but added no tasks");
                break;
            }
            if !decision.needs_more_planning {
                break;
            }
        }

        Ok(tasks)
    }

    async fn execute_and_verify(
        &self,
        request: &str,
        mut tasks: Vec<Todo>,
        start_index: usize,
        max_rounds: usize,
        cancel: &CancellationToken,
    ) -> AgentResult<WorkflowReport> {
        for index in start_index..tasks.len() {
            if cancel.is_cancelled() {
                return Ok(WorkflowReport::halted(RunStatus::Stopped, tasks));
            }

            tasks[index].status = TaskStatus::Executing;
            tasks[index].is_current = true;
            info!(task = %tasks[index].id, "executing task");
            self.callbacks
                .log(&format!("Executing task: {}", tasks[index].description));

            match self
                .execute_task(request, &mut tasks, index, max_rounds, cancel)
                .await
            {
                Ok(TaskOutcome::Continue) => {}
                Ok(TaskOutcome::Paused) => {
                    return Ok(WorkflowReport::halted(RunStatus::Paused, tasks));
                }
                Err(e) if e.is_stopped() => {
                    tasks[index].is_current = false;
                    return Ok(WorkflowReport::halted(RunStatus::Stopped, tasks));
                }
                Err(e) => {
                    self.callbacks.error(&e);
                    return Err(e);
                }
            }
            tasks[index].is_current = false;
        }

        match self.verification_phase(request, tasks, cancel).await {
            Ok(report) => Ok(report),
            Err((e, tasks)) if e.is_stopped() => {
                Ok(WorkflowReport::halted(RunStatus::Stopped, tasks))
            }
            Err((e, _)) => {
                self.callbacks.error(&e);
                Err(e)
            }
        }
    }

    async fn execute_task(
        &self,
        request: &str,
        tasks: &mut Vec<Todo>,
        index: usize,
        max_rounds: usize,
        cancel: &CancellationToken,
    ) -> AgentResult<TaskOutcome> {
        let tools = self.registry.available_tools();
        let system = format!(
            "{}\n{}",
            prompts::base_system_prompt(&tools),
            prompts::executor_system_prompt()
        );

        for round in 0..max_rounds {
            if cancel.is_cancelled() {
                return Err(AgentError::Stopped);
            }
            self.conversation
                .push(ConversationMessage::user(prompts::executor_user_message(
                    &tasks[index],
                    round,
                )))
                .await;

            let (turn_id, outcome) = self
                .role_turn(
                    system.clone(),
                    true,
                    AgentRole::Executor,
                    AgentAction::Exploring,
                    cancel,
                )
                .await?;
            self.retag_executor_turn(&turn_id, &outcome).await;

            if let Some(calls) = &outcome.tool_calls {
                match self.dispatcher.classify(calls) {
                    DispatchDecision::AutoExecute => {
                        self.dispatcher
                            .execute_calls(&self.conversation, calls)
                            .await?;
                        // Tool results are in the history; observation is the
                        // next round.
                    }
                    DispatchDecision::NeedsConfirmation => {
                        self.conversation
                            .set_pending_tool_calls(&turn_id, Some(calls.clone()))
                            .await;
                        self.callbacks
                            .log("Tool calls are awaiting confirmation.");
                        *self.paused.lock().await = Some(PausedPipeline {
                            request: request.to_string(),
                            tasks: tasks.clone(),
                            task_index: index,
                            turn_id,
                            max_execution_rounds: max_rounds,
                        });
                        return Ok(TaskOutcome::Paused);
                    }
                }
            } else if prompts::contains_completion_phrase(&outcome.content) {
                tasks[index].status = TaskStatus::Completed;
                tasks[index].result = Some(outcome.content);
                self.callbacks
                    .log(&format!("Task {} completed", tasks[index].id));
                return Ok(TaskOutcome::Continue);
            }
        }

        // Soft timeout: neither success nor hard failure.
        warn!(task = %tasks[index].id, max_rounds, "execution round cap reached");
        self.callbacks.log(&format!(
            "Task {} hit the round cap without a completion signal",
            tasks[index].id
        ));
        Ok(TaskOutcome::Continue)
    }

    async fn verification_phase(
        &self,
        request: &str,
        mut tasks: Vec<Todo>,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport, (AgentError, Vec<Todo>)> {
        if cancel.is_cancelled() {
            return Err((AgentError::Stopped, tasks));
        }

        let summary = prompts::todos_summary(&tasks);
        self.conversation
            .push(ConversationMessage::user(prompts::verifier_user_message(
                &summary,
            )))
            .await;

        let (_, outcome) = self
            .role_turn(
                prompts::verifier_system_prompt(),
                false,
                AgentRole::Verifier,
                AgentAction::Verifying,
                cancel,
            )
            .await
            .map_err(|e| (e, tasks.clone()))?;

        let Some(verdict) = decode_decision::<VerifierDecision>(&outcome.content) else {
            debug!("no parseable verification verdict");
            return Ok(WorkflowReport::halted(RunStatus::Completed, tasks));
        };

        for task_verdict in &verdict.tasks {
            if task_verdict.completed {
                if let Some(task) = tasks.iter_mut().find(|t| t.id == task_verdict.id) {
                    task.status = TaskStatus::Completed;
                }
            }
        }

        let answer = if verdict.all_completed {
            self.conversation
                .push(ConversationMessage::user(prompts::summary_user_message(
                    request,
                )))
                .await;
            let (_, summary_outcome) = self
                .role_turn(
                    prompts::planner_system_prompt(),
                    false,
                    AgentRole::Planner,
                    AgentAction::Summarizing,
                    cancel,
                )
                .await
                .map_err(|e| (e, tasks.clone()))?;
            Some(summary_outcome.content)
        } else {
            None
        };

        Ok(WorkflowReport {
            status: RunStatus::Completed,
            tasks,
            all_completed: verdict.all_completed,
            verdicts: verdict.tasks,
            overall_feedback: verdict.overall_feedback,
            improvements: verdict.improvements,
            summary: answer,
        })
    }

    /// Executor messages show what the turn actually did: calling a tool, or
    /// thinking when a reasoning trace arrived.
    async fn retag_executor_turn(&self, turn_id: &str, outcome: &TurnOutcome) {
        let action = if outcome.tool_calls.is_some() {
            Some(AgentAction::CallingTool)
        } else if outcome.reasoning.is_some() {
            Some(AgentAction::Thinking)
        } else {
            None
        };
        if let Some(action) = action {
            self.conversation
                .set_tags(turn_id, Some(AgentRole::Executor), Some(action))
                .await;
        }
    }

    async fn role_turn(
        &self,
        system_prompt: String,
        with_tools: bool,
        role: AgentRole,
        action: AgentAction,
        cancel: &CancellationToken,
    ) -> AgentResult<(String, TurnOutcome)> {
        let turn_id = Uuid::new_v4().to_string();
        let input = TurnInput {
            turn_id: turn_id.clone(),
            tools: with_tools.then(|| self.registry.available_tools()),
            system_prompt,
            agent_role: Some(role),
            agent_action: Some(action),
        };
        let outcome = self
            .consumer
            .run_turn(&self.conversation, input, cancel)
            .await?;
        Ok((turn_id, outcome))
    }
}

enum TaskOutcome {
    /// Move on to the next task
    Continue,
    /// Paused for tool-call confirmation
    Paused,
}
