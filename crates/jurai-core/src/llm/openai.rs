use crate::error::JuraiError;
use crate::llm::provider::ModelConfig;
use crate::llm::traits::*;
use crate::tools::ToolDefinition;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint
/// (Groq, OpenAI, Together, OpenRouter, Ollama, LM Studio).
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: crate::constants::models::DEFAULT_OPENAI_MODEL.to_string(),
            base_url: crate::constants::endpoints::OPENAI_BASE_URL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.api_key().unwrap_or_default())
            .with_model(config.model())
            .with_base_url(config.base_url())
            .with_temperature(config.temperature())
            .with_max_tokens(config.max_tokens())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_tool_defs(&self, tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition], stream: bool) -> OpenAIRequest {
        let has_tools = !tools.is_empty();
        OpenAIRequest {
            model: self.model.clone(),
            messages: messages.iter().map(wire_message).collect(),
            tools: has_tools.then(|| self.build_tool_defs(tools)),
            tool_choice: has_tools.then(|| "auto".to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: stream.then_some(true),
        }
    }

    async fn send(&self, body: &OpenAIRequest) -> Result<reqwest::Response, JuraiError> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(JuraiError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(response)
    }
}

fn wire_message(m: &Message) -> Value {
    if let Some(ref tool_call_id) = m.tool_call_id {
        serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": m.content,
        })
    } else if let Some(ref tool_calls) = m.tool_calls {
        let tcs: Vec<Value> = tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.function.name,
                        "arguments": tc.function.arguments,
                    }
                })
            })
            .collect();
        serde_json::json!({
            "role": "assistant",
            "content": m.content,
            "tool_calls": tcs,
        })
    } else {
        serde_json::json!({
            "role": m.role,
            "content": m.content,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Decode a raw chat-completions body. An empty choice list is a valid,
/// content-free answer; a choice without a message is malformed.
fn decode_response(body: &str) -> Result<LlmResponse, JuraiError> {
    let api_response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| JuraiError::MalformedResponse(format!("failed to parse response: {e}")))?;

    let usage = api_response.usage.map(|u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let Some(choice) = api_response.choices.into_iter().next() else {
        return Ok(LlmResponse { choice: None, usage });
    };

    let message = choice
        .message
        .ok_or_else(|| JuraiError::MalformedResponse("choice carries no message".into()))?;

    let content = message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall::function(tc.id, tc.function.name, tc.function.arguments))
        .collect();

    let message = if tool_calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::assistant_with_tools(content, tool_calls)
    };

    Ok(LlmResponse {
        choice: Some(message),
        usage,
    })
}

#[async_trait::async_trait]
impl LlmClient for OpenAIClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, JuraiError> {
        let request_body = self.build_request(messages, tools, false);
        let response = self.send(&request_body).await?;
        let response_text = response.text().await?;
        decode_response(&response_text)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>, JuraiError> {
        let request_body = self.build_request(messages, tools, true);
        let response = self.send(&request_body).await?;

        let (tx, rx) = mpsc::unbounded();

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut lines = SseLines::default();
            // The id only arrives on the first delta of each tool call, keyed by index.
            let mut tool_call_ids: HashMap<u64, String> = HashMap::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    if !forward_line(&line, &tx, &mut tool_call_ids) {
                        return;
                    }
                }
            }

            if let Some(line) = lines.finish() {
                if !forward_line(&line, &tx, &mut tool_call_ids) {
                    return;
                }
            }
            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(rx)
    }
}

/// Splits an SSE body into lines. Bytes are buffered until a newline so a
/// multi-byte character split across network chunks decodes intact.
#[derive(Default)]
struct SseLines {
    pending: Vec<u8>,
}

impl SseLines {
    /// Complete lines in `chunk` plus whatever was left over, trimmed.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&line[..end]));
        }
        lines
    }

    /// The final line when the body does not end with a newline.
    fn finish(self) -> Option<String> {
        let line = decode_line(&self.pending);
        (!line.is_empty()).then_some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(line) => line.trim().to_string(),
        Err(_) => String::from_utf8_lossy(bytes).trim().to_string(),
    }
}

/// Decode one SSE line and send its events. Returns `false` once the stream
/// is over, either at `[DONE]` or because the consumer hung up.
fn forward_line(
    line: &str,
    tx: &mpsc::UnboundedSender<StreamEvent>,
    tool_call_ids: &mut HashMap<u64, String>,
) -> bool {
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return true;
    };

    if data == "[DONE]" {
        for (_, id) in tool_call_ids.drain() {
            let _ = tx.unbounded_send(StreamEvent::ToolCallEnd { id });
        }
        let _ = tx.unbounded_send(StreamEvent::Done);
        return false;
    }

    let Ok(event) = serde_json::from_str::<Value>(data) else {
        return true;
    };
    for stream_event in decode_delta(&event, tool_call_ids) {
        if tx.unbounded_send(stream_event).is_err() {
            // Consumer stopped listening, e.g. after seeing a tool fragment.
            return false;
        }
    }
    true
}

/// Translate one `data:` chunk into stream events.
fn decode_delta(event: &Value, tool_call_ids: &mut HashMap<u64, String>) -> Vec<StreamEvent> {
    let mut out = Vec::new();

    let Some(delta) = event
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|c| c.get("delta"))
    else {
        return out;
    };

    if let Some(content) = delta.get("content").and_then(|c| c.as_str()) {
        if !content.is_empty() {
            out.push(StreamEvent::TextDelta(content.to_string()));
        }
    }

    if let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
        for tc in tool_calls {
            let index = tc.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            if let Some(id) = tc.get("id").and_then(|i| i.as_str()) {
                if !id.is_empty() {
                    tool_call_ids.insert(index, id.to_string());
                }
            }
            let id = tool_call_ids.get(&index).cloned().unwrap_or_default();
            let Some(func) = tc.get("function") else {
                continue;
            };
            if let Some(name) = func.get("name").and_then(|n| n.as_str()) {
                if !name.is_empty() {
                    out.push(StreamEvent::ToolCallStart {
                        id: id.clone(),
                        name: name.to_string(),
                    });
                }
            }
            if let Some(args) = func.get("arguments").and_then(|a| a.as_str()) {
                if !args.is_empty() {
                    out.push(StreamEvent::ToolCallDelta {
                        id: id.clone(),
                        arguments_delta: args.to_string(),
                    });
                }
            }
        }
    }

    out
}
