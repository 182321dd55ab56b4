#![allow(dead_code)]

use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use jurai_core::llm::ToolCall;
use jurai_core::{
    EventSink, JuraiError, LlmClient, LlmResponse, Message, ModelClient, ModelConfig, ProgressEvent,
    ProviderId, StreamEvent, Tool, ToolDefinition, ToolResult,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted model turn. The same script serves `chat` and `chat_stream`.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    ToolCall { name: String, args: String },
    Empty,
    Fail(u16),
    /// Provider error with a specific response body.
    FailWith(u16, String),
    Malformed,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }

    pub fn tool(name: &str, args: Value) -> Self {
        Reply::ToolCall {
            name: name.to_string(),
            args: args.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub streamed: bool,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Mock LLM that plays back scripted replies in order and records every call.
/// Once the script runs out it answers "Mock response".
pub struct MockLlm {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl MockLlm {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, streamed: bool, messages: &[Message], tools: &[ToolDefinition]) -> Reply {
        self.calls.lock().unwrap().push(Call {
            streamed,
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::text("Mock response"))
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse, JuraiError> {
        match self.next(false, messages, tools) {
            Reply::Text(text) => Ok(LlmResponse::message(Message::assistant(text))),
            Reply::ToolCall { name, args } => Ok(LlmResponse::message(Message::assistant_with_tools(
                "",
                vec![ToolCall::function("call_1", name, args)],
            ))),
            Reply::Empty => Ok(LlmResponse::empty()),
            Reply::Fail(status) => Err(JuraiError::Api {
                status,
                message: "scripted failure".into(),
            }),
            Reply::FailWith(status, message) => Err(JuraiError::Api { status, message }),
            Reply::Malformed => Err(JuraiError::MalformedResponse("choice without message".into())),
        }
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<UnboundedReceiver<StreamEvent>, JuraiError> {
        let events = match self.next(true, messages, tools) {
            Reply::Text(text) => {
                // split mid-word to exercise sentence buffering
                let mut events: Vec<StreamEvent> = text
                    .as_bytes()
                    .chunks(7)
                    .map(|chunk| StreamEvent::TextDelta(String::from_utf8_lossy(chunk).into_owned()))
                    .collect();
                events.push(StreamEvent::Done);
                events
            }
            Reply::ToolCall { name, args } => vec![
                StreamEvent::ToolCallStart {
                    id: "call_1".into(),
                    name,
                },
                StreamEvent::ToolCallDelta {
                    id: "call_1".into(),
                    arguments_delta: args,
                },
                StreamEvent::ToolCallEnd { id: "call_1".into() },
                StreamEvent::Done,
            ],
            Reply::Empty => vec![StreamEvent::Done],
            Reply::Fail(status) => {
                return Err(JuraiError::Api {
                    status,
                    message: "scripted failure".into(),
                })
            }
            Reply::FailWith(status, message) => return Err(JuraiError::Api { status, message }),
            Reply::Malformed => vec![StreamEvent::Error("malformed chunk".into())],
        };

        let (tx, rx) = unbounded();
        for event in events {
            tx.unbounded_send(event).unwrap();
        }
        Ok(rx)
    }
}

/// A model client over `llm` with no backoff so retries are instant.
pub fn client(llm: &Arc<MockLlm>) -> ModelClient {
    client_with_retries(llm, 10)
}

pub fn client_with_retries(llm: &Arc<MockLlm>, retries: u32) -> ModelClient {
    let config = ModelConfig::new(ProviderId::Custom("mock".into()), "mock-model")
        .with_retries(retries)
        .with_retry_backoff(Duration::ZERO);
    ModelClient::new(config, llm.clone())
}

/// Event sink that records everything it is given.
pub fn recording_sink() -> (EventSink, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let events = events.clone();
        EventSink::new(move |event| events.lock().unwrap().push(event))
    };
    (sink, events)
}

/// Tool that echoes its `query` and counts executions.
pub struct EchoTool {
    pub executions: Arc<AtomicUsize>,
}

impl EchoTool {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        (
            Self {
                executions: executions.clone(),
            },
            executions,
        )
    }
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the query"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> ToolResult {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match params.get("query").and_then(|q| q.as_str()) {
            Some(query) => Ok(serde_json::json!({"echoed": query})),
            None => Err(JuraiError::tool("echo", "Missing required parameter: query")),
        }
    }
}
