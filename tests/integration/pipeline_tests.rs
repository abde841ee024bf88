//! Role-Pipeline Workflow Tests
//!
//! Planner/executor/verifier scenarios over the scripted completion backend:
//! planning stall guard, priority ordering, confirmation pause/resume,
//! mid-run stop, and the end-to-end summarize-a-file run.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use taskweave::{RunStatus, TaskStatus, ToolCall, WorkflowOptions};

use crate::common::{hanging_turn, text_turn, tool_call_turn, Harness};

fn plan(needs_more: bool, todos: &[(&str, &str, i64)]) -> Vec<taskweave::StreamEvent> {
    let todos: Vec<_> = todos
        .iter()
        .map(|(id, desc, prio)| json!({"id": id, "description": desc, "priority": prio}))
        .collect();
    text_turn(
        &json!({"needsMorePlanning": needs_more, "todos": todos}).to_string(),
    )
}

#[tokio::test]
async fn test_planning_stops_when_stalled() {
    // Round two repeats the same task while asking for more planning; the
    // stall guard must end the phase before the round cap.
    let harness = Harness::new(vec![
        plan(true, &[("t1", "do the thing", 1)]),
        plan(true, &[("t1", "do the thing", 1)]),
        text_turn("任务完成"),
        text_turn("no verdict here"),
    ]);
    let workflow = harness.workflow();

    let report = workflow
        .run(WorkflowOptions::new("do the thing"))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.tasks.len(), 1);
    // 2 planning + 1 execution + 1 verification; no third planning round.
    assert_eq!(harness.backend.request_count(), 4);
}

#[tokio::test]
async fn test_unparseable_plan_ends_run_without_tasks() {
    let harness = Harness::new(vec![text_turn("I cannot plan this.")]);
    let workflow = harness.workflow();

    let report = workflow.run(WorkflowOptions::new("???")).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.tasks.is_empty());
    assert_eq!(harness.backend.request_count(), 1);
}

#[tokio::test]
async fn test_tasks_execute_in_ascending_priority_order() {
    let harness = Harness::new(vec![
        plan(
            false,
            &[("a", "second", 2), ("b", "first", 1), ("c", "third", 3)],
        ),
        text_turn("任务完成 b"),
        text_turn("任务完成 a"),
        text_turn("任务完成 c"),
        text_turn("not a verdict"),
    ]);
    let workflow = harness.workflow();

    let report = workflow.run(WorkflowOptions::new("ordered work")).await.unwrap();

    let order: Vec<&str> = report.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    for task in &report.tasks {
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.result.as_ref().unwrap().contains(&task.id));
    }
}

#[tokio::test]
async fn test_default_provider_calls_auto_execute() {
    let harness = Harness::with_tools(
        vec![
            plan(false, &[("t1", "read it", 1)]),
            tool_call_turn(vec![ToolCall::function_call(
                "c1",
                "read_file",
                r#"{"path":"/tmp/x"}"#,
            )]),
            text_turn("任务完成"),
            text_turn("no verdict"),
        ],
        vec![("read_file", json!("file body"))],
    );
    let workflow = harness.workflow();

    let report = workflow.run(WorkflowOptions::new("read it")).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(harness.tools.executed_tools(), vec!["read_file"]);

    // Auto-executed calls never become pending.
    let snapshot = harness.conversation.snapshot().await;
    assert!(snapshot.iter().all(|m| m.pending_tool_calls.is_none()));
}

#[tokio::test]
async fn test_non_default_calls_pause_until_confirmed() {
    let harness = Harness::with_tools(
        vec![
            plan(false, &[("t1", "fetch it", 1)]),
            tool_call_turn(vec![ToolCall::function_call(
                "c1",
                "http_get",
                r#"{"url":"https://example.com"}"#,
            )]),
            // Consumed only after confirmation resumes the task.
            text_turn("任务完成"),
            text_turn(
                &json!({"allCompleted": true, "tasks": [{"id": "t1", "completed": true}]})
                    .to_string(),
            ),
            text_turn("Here is your answer."),
        ],
        vec![("http_get", json!("<html/>"))],
    );
    let workflow = harness.workflow();

    let report = workflow.run(WorkflowOptions::new("fetch it")).await.unwrap();
    assert_eq!(report.status, RunStatus::Paused);
    assert!(harness.tools.executed_tools().is_empty());

    let snapshot = harness.conversation.snapshot().await;
    let pending = snapshot
        .iter()
        .find(|m| m.pending_tool_calls.is_some())
        .expect("an assistant message should hold the pending calls");
    assert_eq!(pending.pending_tool_calls.as_ref().unwrap().len(), 1);

    let report = workflow.confirm_pending().await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.all_completed);
    assert_eq!(report.summary.as_deref(), Some("Here is your answer."));
    assert_eq!(harness.tools.executed_tools(), vec!["http_get"]);
}

#[tokio::test]
async fn test_stop_mid_execution_preserves_completed_tasks() {
    let harness = Harness::new(vec![
        plan(false, &[("t1", "quick", 1), ("t2", "slow", 2)]),
        text_turn("任务完成"),
        hanging_turn("working on t2..."),
    ]);
    let workflow = Arc::new(harness.workflow());

    let running = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.run(WorkflowOptions::new("two tasks")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    workflow.stop();

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.tasks[0].status, TaskStatus::Completed);
    assert_eq!(report.tasks[1].status, TaskStatus::Executing);

    // No further model turns after the stop.
    assert_eq!(harness.backend.request_count(), 3);
}

#[tokio::test]
async fn test_stop_during_planning_keeps_planned_tasks() {
    // Round one plans a task; round two never terminates. The stopped report
    // must still carry the task from round one.
    let harness = Harness::new(vec![
        plan(true, &[("t1", "already planned", 1)]),
        hanging_turn("still planning..."),
    ]);
    let workflow = Arc::new(harness.workflow());

    let running = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.run(WorkflowOptions::new("slow plan")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    workflow.stop();

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.tasks.len(), 1);
    assert_eq!(report.tasks[0].id, "t1");
    assert_eq!(harness.backend.request_count(), 2);
}

#[tokio::test]
async fn test_end_to_end_summarize_file() {
    let harness = Harness::with_tools(
        vec![
            plan(false, &[("t1", "summarize file X", 1)]),
            tool_call_turn(vec![ToolCall::function_call(
                "c1",
                "read_file",
                r#"{"path":"X"}"#,
            )]),
            text_turn("任务完成：the file greets the reader"),
            text_turn(
                &json!({
                    "allCompleted": true,
                    "tasks": [{"id": "t1", "completed": true, "feedback": "verified"}],
                    "overallFeedback": "all good",
                    "improvements": []
                })
                .to_string(),
            ),
            text_turn("The file contains a short greeting."),
        ],
        vec![("read_file", json!("hello world"))],
    );
    let workflow = harness.workflow();

    let report = workflow
        .run(WorkflowOptions::new("summarize file X"))
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.all_completed);
    assert_eq!(report.tasks[0].status, TaskStatus::Completed);
    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.overall_feedback.as_deref(), Some("all good"));
    assert_eq!(
        report.summary.as_deref(),
        Some("The file contains a short greeting.")
    );

    // The tool result flowed through the conversation as a tool message.
    let snapshot = harness.conversation.snapshot().await;
    assert!(snapshot
        .iter()
        .any(|m| m.name.as_deref() == Some("read_file") && m.content == "hello world"));
}
