//! Shared Test Fixtures
//!
//! Scripted mock backends: each model turn consumes the next event script in
//! FIFO order, so tests declare the whole conversation up front. The
//! completion mock enforces the subscribe-before-request contract and
//! answers `cancel` with a `stopped` event on the live turn channel.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use taskweave::services::backend::{
    CompletionBackend, CompletionRequest, MessageStore, ToolBackend,
};
use taskweave::{
    AgentError, AgentResult, AgentWorkflow, ConversationHandle, ConversationMessage, ReActLoop,
    RunCallbacks, StreamConsumer, StreamEvent, ToolCall, ToolDispatcher, ToolInfo,
    ToolProviderInfo, ToolProviderRegistry,
};

/// Script for one turn: the events the backend emits.
pub type TurnScript = Vec<StreamEvent>;

/// A turn that streams text and finishes.
pub fn text_turn(content: &str) -> TurnScript {
    vec![
        StreamEvent::Content {
            content: content.to_string(),
        },
        StreamEvent::Done,
    ]
}

/// A turn that proposes tool calls and finishes.
pub fn tool_call_turn(calls: Vec<ToolCall>) -> TurnScript {
    vec![StreamEvent::ToolCalls { tool_calls: calls }, StreamEvent::Done]
}

/// A turn that streams content but never terminates; only a cancel ends it.
pub fn hanging_turn(content: &str) -> TurnScript {
    vec![StreamEvent::Content {
        content: content.to_string(),
    }]
}

pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<TurnScript>>,
    requests: Mutex<Vec<CompletionRequest>>,
    cancelled: Mutex<Vec<String>>,
    /// turn_id -> sender, inserted on subscribe
    live: Mutex<HashMap<String, mpsc::Sender<StreamEvent>>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<TurnScript>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            live: Mutex::new(HashMap::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn cancelled_turns(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn subscribe(&self, turn_id: &str) -> AgentResult<mpsc::Receiver<StreamEvent>> {
        let (tx, rx) = mpsc::channel(256);
        self.live.lock().unwrap().insert(turn_id.to_string(), tx);
        Ok(rx)
    }

    async fn start_completion(&self, request: CompletionRequest) -> AgentResult<()> {
        let tx = self
            .live
            .lock()
            .unwrap()
            .get(&request.turn_id)
            .cloned()
            .ok_or_else(|| AgentError::backend("start_completion before subscribe"))?;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                vec![StreamEvent::Error {
                    message: "script exhausted".to_string(),
                }]
            });
        self.requests.lock().unwrap().push(request);
        for event in script {
            let _ = tx.send(event).await;
        }
        Ok(())
    }

    async fn cancel(&self, turn_id: &str) -> AgentResult<()> {
        self.cancelled.lock().unwrap().push(turn_id.to_string());
        let tx = self.live.lock().unwrap().get(turn_id).cloned();
        if let Some(tx) = tx {
            let _ = tx.send(StreamEvent::Stopped).await;
        }
        Ok(())
    }
}

/// Records executed tool calls and answers from a canned result table.
pub struct RecordingTools {
    pub calls: Mutex<Vec<(String, String, Value)>>,
    results: HashMap<String, Value>,
}

impl RecordingTools {
    pub fn new(results: Vec<(&str, Value)>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            results: results
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        })
    }

    pub fn executed_tools(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl ToolBackend for RecordingTools {
    async fn execute(
        &self,
        provider_key: &str,
        tool_name: &str,
        args: Value,
        _context_hints: Value,
    ) -> AgentResult<Value> {
        self.calls.lock().unwrap().push((
            provider_key.to_string(),
            tool_name.to_string(),
            args,
        ));
        Ok(self
            .results
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| json!({"ok": true})))
    }
}

/// Remembers every persisted message.
pub struct RecordingStore {
    pub saved: Mutex<Vec<ConversationMessage>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            saved: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn save_message(
        &self,
        message: &ConversationMessage,
        _conversation_id: &str,
    ) -> AgentResult<()> {
        self.saved.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Standard registry: a default filesystem provider plus a gated network
/// provider.
pub fn test_registry() -> Arc<ToolProviderRegistry> {
    Arc::new(ToolProviderRegistry::new(vec![
        ToolProviderInfo {
            key: "fs".to_string(),
            name: "Filesystem".to_string(),
            enabled: true,
            connected: true,
            is_default: true,
            tools: vec![ToolInfo {
                name: "read_file".to_string(),
                description: "Read a file".to_string(),
            }],
        },
        ToolProviderInfo {
            key: "net".to_string(),
            name: "Network".to_string(),
            enabled: true,
            connected: true,
            is_default: false,
            tools: vec![ToolInfo {
                name: "http_get".to_string(),
                description: "Fetch a URL".to_string(),
            }],
        },
    ]))
}

/// Everything a scenario needs, wired together.
pub struct Harness {
    pub conversation: Arc<ConversationHandle>,
    pub backend: Arc<ScriptedBackend>,
    pub tools: Arc<RecordingTools>,
    pub store: Arc<RecordingStore>,
    pub registry: Arc<ToolProviderRegistry>,
}

impl Harness {
    pub fn new(scripts: Vec<TurnScript>) -> Self {
        Self::with_tools(scripts, vec![])
    }

    pub fn with_tools(scripts: Vec<TurnScript>, tool_results: Vec<(&str, Value)>) -> Self {
        Self {
            conversation: Arc::new(ConversationHandle::new(
                "conv-test",
                vec![],
                Arc::new(|_| {}),
            )),
            backend: ScriptedBackend::new(scripts),
            tools: RecordingTools::new(tool_results),
            store: RecordingStore::new(),
            registry: test_registry(),
        }
    }

    pub fn consumer(&self) -> StreamConsumer {
        StreamConsumer::new(self.backend.clone(), self.store.clone())
    }

    pub fn dispatcher(&self) -> ToolDispatcher {
        ToolDispatcher::new(self.registry.clone(), self.tools.clone(), self.store.clone())
    }

    pub fn workflow(&self) -> AgentWorkflow {
        AgentWorkflow::new(
            self.conversation.clone(),
            self.consumer(),
            self.dispatcher(),
            self.registry.clone(),
            RunCallbacks::default(),
        )
    }

    pub fn react(&self) -> ReActLoop {
        ReActLoop::new(
            self.conversation.clone(),
            self.consumer(),
            self.dispatcher(),
            self.registry.clone(),
            RunCallbacks::default(),
        )
    }
}
