//! Prompt Construction
//!
//! Role framing for every kind of turn, plus the helpers that read structured
//! decisions back out of model text. Prompts are plain functions over the
//! run's state; nothing here touches the network.

use taskweave_core::parse_partial_json;

use crate::models::{decode_decision, AgentMeta, ToolInfo, Todo};

/// Phrases the executor scans for when a no-tool-call turn may mean "task
/// done". Matching is substring containment on lowercased text. Fragile by
/// nature; the prompt asks for these exact phrases to keep it workable.
const COMPLETION_PHRASES: &[&str] = &["任务完成", "已完成", "完成", "任务执行完成"];

const AGENT_META_OPEN: &str = "<agent_meta>";
const AGENT_META_CLOSE: &str = "</agent_meta>";

/// Base system framing shared by every turn that may call tools. Carries the
/// prompt-level deduplication directive: reuse of prior identical tool
/// results is requested from the model, not enforced in code.
pub fn base_system_prompt(tools: &[ToolInfo]) -> String {
    let mut prompt = String::from(
        "You are a capable assistant that can call external tools.\n\
         Before proposing a tool call, scan the conversation history for a \
         prior call with the exact same tool name and arguments; if one \
         exists, reuse its result instead of calling the tool again.\n",
    );
    if !tools.is_empty() {
        prompt.push_str("\nAvailable tools:\n");
        for tool in tools {
            prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        }
    }
    prompt
}

pub fn planner_system_prompt() -> String {
    "You are the planner. Decompose the user's request into concrete, \
     independently executable tasks.\n\
     Respond with a JSON object:\n\
     {\"needsMorePlanning\": boolean, \"todos\": [{\"id\": string, \
     \"description\": string, \"priority\": number}]}\n\
     Lower priority numbers run first. Task ids must be unique. Set \
     needsMorePlanning to true only if you genuinely need another round."
        .to_string()
}

/// User message for a planning round. The first round carries the request;
/// continuation rounds ask for refinement of the existing list.
pub fn planner_user_message(round: usize, request: &str, existing: &[Todo]) -> String {
    if round == 0 {
        format!("Plan the following request into tasks:\n\n{request}")
    } else {
        let listed: Vec<String> = existing
            .iter()
            .map(|t| format!("- [{}] {} (priority {})", t.id, t.description, t.priority))
            .collect();
        format!(
            "Current task list:\n{}\n\nAdd any further tasks still needed for the \
             original request. Only propose new tasks; do not repeat existing ids.",
            listed.join("\n")
        )
    }
}

pub fn executor_system_prompt() -> String {
    "You are the executor. Complete the current task, calling tools when \
     needed. When the task is fully done, reply without tool calls and state \
     \"任务完成\" followed by a short result."
        .to_string()
}

/// User message for an execution round. Round 0 introduces the task;
/// continuation rounds nudge after tool results arrived.
pub fn executor_user_message(task: &Todo, round: usize) -> String {
    if round == 0 {
        format!(
            "Execute this task now:\n\nTask [{}]: {}",
            task.id, task.description
        )
    } else {
        "Continue with the task using the tool results above. If it is done, \
         reply \"任务完成\" with the result."
            .to_string()
    }
}

pub fn verifier_system_prompt() -> String {
    "You are the verifier. Judge whether each task was actually completed \
     based on its recorded result."
        .to_string()
}

/// Verifier user message over the compact task summary. Scores at or above
/// 80 count as completed.
pub fn verifier_user_message(tasks_summary: &str) -> String {
    format!(
        "Review the tasks below. Score each from 0 to 100; a score of 80 or \
         above counts as completed.\n\n{tasks_summary}\n\n\
         Respond with a JSON object:\n\
         {{\"allCompleted\": boolean, \"tasks\": [{{\"id\": string, \
         \"completed\": boolean, \"feedback\": string}}], \
         \"overallFeedback\": string, \"improvements\": [string]}}"
    )
}

/// Summary turn reuses the original request: the answer should address the
/// user, not narrate the workflow.
pub fn summary_user_message(request: &str) -> String {
    format!(
        "All tasks are complete. Based on the work above, answer the original \
         request directly:\n\n{request}\n\n\
         Summarize the outcome for the user; do not describe the workflow."
    )
}

pub fn react_system_prompt() -> String {
    format!(
        "You reason in explicit steps. End every reasoning reply with a \
         decision envelope:\n\
         {AGENT_META_OPEN}{{\"shouldContinue\": boolean, \"nextAction\": \
         string, \"reason\": string}}{AGENT_META_CLOSE}\n\
         nextAction is the name of a tool to call next, or \"answer\" to \
         answer the user directly, or \"analyze\" to keep reasoning without \
         tools."
    )
}

pub fn thought_user_message(request: &str, iteration: usize) -> String {
    if iteration == 0 {
        format!("Think about how to handle this request:\n\n{request}")
    } else {
        "Given everything above, decide the next step.".to_string()
    }
}

pub fn action_user_message(meta: &AgentMeta) -> String {
    match meta.next_action.as_str() {
        "answer" => "Answer the user now, based on everything above.".to_string(),
        "analyze" => "Analyze the information gathered so far.".to_string(),
        tool => format!("Carry out the next step using the `{tool}` tool."),
    }
}

pub fn observation_user_message() -> String {
    "Summarize what the tool results above mean for the task.".to_string()
}

/// Compact task summary fed to the verifier. Results are truncated so long
/// tool output cannot blow up the verifier context.
pub fn todos_summary(tasks: &[Todo]) -> String {
    tasks
        .iter()
        .map(|t| {
            let result = t.result.as_deref().unwrap_or("(no result)");
            let truncated: String = result.chars().take(100).collect();
            format!(
                "- id: {} | {} | status: {:?} | result: {}",
                t.id, t.description, t.status, truncated
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether free text declares the current task finished.
pub fn contains_completion_phrase(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPLETION_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Extract the decision envelope from a reasoning turn. Looks inside
/// `<agent_meta>` tags first (tolerating a missing closing tag while the
/// text is still streaming), then falls back to scanning the whole text.
pub fn extract_agent_meta(text: &str) -> Option<AgentMeta> {
    if let Some(start) = text.find(AGENT_META_OPEN) {
        let inner_start = start + AGENT_META_OPEN.len();
        let inner = match text[inner_start..].find(AGENT_META_CLOSE) {
            Some(end) => &text[inner_start..inner_start + end],
            None => &text[inner_start..],
        };
        let partial = parse_partial_json(inner);
        if let Ok(meta) = serde_json::from_value::<AgentMeta>(partial.data) {
            return Some(meta);
        }
    }
    decode_decision(text)
}

/// Strip the decision envelope from user-visible text.
pub fn remove_agent_meta(text: &str) -> String {
    let Some(start) = text.find(AGENT_META_OPEN) else {
        return text.to_string();
    };
    let mut cleaned = text[..start].to_string();
    if let Some(end) = text[start..].find(AGENT_META_CLOSE) {
        cleaned.push_str(&text[start + end + AGENT_META_CLOSE.len()..]);
    }
    cleaned.trim().to_string()
}
