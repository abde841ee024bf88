//! Stream Consumer Tests
//!
//! One-turn lifecycle: fragment accumulation, terminal-event handling, the
//! distinguished stop error, and persistence of the finalized message.

use tokio_util::sync::CancellationToken;

use taskweave::{AgentError, Role, StreamEvent, ToolCall, TurnInput};

use crate::common::{text_turn, Harness};

fn turn_input(turn_id: &str) -> TurnInput {
    TurnInput {
        turn_id: turn_id.to_string(),
        tools: None,
        system_prompt: "test".to_string(),
        agent_role: None,
        agent_action: None,
    }
}

#[tokio::test]
async fn test_content_fragments_accumulate() {
    let harness = Harness::new(vec![vec![
        StreamEvent::Content {
            content: "a".to_string(),
        },
        StreamEvent::Content {
            content: "b".to_string(),
        },
        StreamEvent::Done,
    ]]);
    let consumer = harness.consumer();

    let outcome = consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.content, "ab");
    assert!(outcome.tool_calls.is_none());
    assert!(outcome.reasoning.is_none());

    let message = harness.conversation.get("turn-1").await.unwrap();
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content, "ab");
}

#[tokio::test]
async fn test_stopped_rejects_with_distinguished_error() {
    let harness = Harness::new(vec![vec![
        StreamEvent::Content {
            content: "partial".to_string(),
        },
        StreamEvent::Stopped,
    ]]);
    let consumer = harness.consumer();

    let err = consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_stopped(), "expected the stop error, got: {err}");
    // The partial message stays in the conversation as-is.
    let message = harness.conversation.get("turn-1").await.unwrap();
    assert_eq!(message.content, "partial");
}

#[tokio::test]
async fn test_error_event_propagates_backend_failure() {
    let harness = Harness::new(vec![vec![StreamEvent::Error {
        message: "rate limited".to_string(),
    }]]);
    let consumer = harness.consumer();

    let err = consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Backend(ref m) if m == "rate limited"));
    assert!(!err.is_stopped());
}

#[tokio::test]
async fn test_blank_reasoning_is_omitted() {
    let harness = Harness::new(vec![vec![
        StreamEvent::Reasoning {
            content: "  \n".to_string(),
        },
        StreamEvent::Content {
            content: "answer".to_string(),
        },
        StreamEvent::Done,
    ]]);
    let consumer = harness.consumer();

    let outcome = consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(outcome.reasoning.is_none());
    let message = harness.conversation.get("turn-1").await.unwrap();
    assert!(message.reasoning.is_none());
}

#[tokio::test]
async fn test_tool_calls_accumulate_across_events() {
    let harness = Harness::new(vec![vec![
        StreamEvent::ToolCalls {
            tool_calls: vec![ToolCall::function_call("c1", "read_file", "{}")],
        },
        StreamEvent::ToolCalls {
            tool_calls: vec![ToolCall::function_call("c2", "http_get", "{}")],
        },
        StreamEvent::Done,
    ]]);
    let consumer = harness.consumer();

    let outcome = consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let calls = outcome.tool_calls.unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "c1");
    assert_eq!(calls[1].id, "c2");
}

#[tokio::test]
async fn test_finalized_message_is_persisted() {
    let harness = Harness::new(vec![text_turn("hello")]);
    let consumer = harness.consumer();

    consumer
        .run_turn(
            &harness.conversation,
            turn_input("turn-1"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let saved = harness.store.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "turn-1");
    assert_eq!(saved[0].content, "hello");
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_turn() {
    let harness = Harness::new(vec![vec![StreamEvent::Content {
        content: "never finishes".to_string(),
    }]]);
    let consumer = harness.consumer();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = consumer
        .run_turn(&harness.conversation, turn_input("turn-1"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_stopped());
    assert_eq!(harness.backend.cancelled_turns(), vec!["turn-1"]);
}
