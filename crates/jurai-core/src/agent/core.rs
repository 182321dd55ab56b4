use crate::constants::agent::{EMPTY_RESPONSE, INCOMPLETE_RESPONSE};
use crate::error::{JuraiError, Result};
use crate::llm::{preview, Message, ModelClient, Streamed};
use crate::tools::{stringify_result, ToolDefinition, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;

/// Receives the log lines an agent produces while it works: streamed
/// sentences, tool calls, tool results and errors.
pub trait LogSink: Send {
    fn log(&mut self, line: &str);
}

impl<F> LogSink for F
where
    F: FnMut(&str) + Send,
{
    fn log(&mut self, line: &str) {
        self(line)
    }
}

struct NoopLog;

impl LogSink for NoopLog {
    fn log(&mut self, _line: &str) {}
}

/// A named model persona: one instruction, one model, optional tools.
///
/// Each [`run`](Agent::run) builds its own conversation from scratch; nothing
/// is carried over between calls.
pub struct Agent {
    name: String,
    instruction: String,
    model: ModelClient,
    tools: Arc<ToolRegistry>,
    streaming: bool,
}

impl Agent {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>, model: ModelClient) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            model,
            tools: Arc::new(ToolRegistry::new()),
            streaming: false,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Stream model output, forwarding complete sentences to the log.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn. Never fails: model faults come back as readable text.
    pub async fn run(
        &self,
        message: &str,
        context: Option<&Value>,
        on_log: Option<&mut dyn LogSink>,
    ) -> String {
        match self.run_checked(message, context, on_log).await {
            Ok(content) => content,
            Err(e) => failure_text(&e),
        }
    }

    /// Like [`run`](Agent::run), but a failed model call is returned as the
    /// error instead of being folded into the reply. The `Agent Error:` line
    /// is still logged.
    pub async fn run_checked(
        &self,
        message: &str,
        context: Option<&Value>,
        on_log: Option<&mut dyn LogSink>,
    ) -> Result<String> {
        tracing::info!(agent = %self.name, "--- {} running ---", self.name);

        let mut noop = NoopLog;
        let log: &mut dyn LogSink = match on_log {
            Some(log) => log,
            None => &mut noop,
        };

        self.try_run(message, context, &mut *log).await.map_err(|e| {
            tracing::error!(agent = %self.name, "Agent run failed: {e}");
            log.log(&format!("Agent Error: {e}"));
            e
        })
    }

    async fn try_run(
        &self,
        message: &str,
        context: Option<&Value>,
        log: &mut dyn LogSink,
    ) -> Result<String> {
        let mut messages = vec![
            Message::system(self.instruction.as_str()),
            Message::user(compose_user_message(message, context)?),
        ];

        let tool_definitions = self.tools.definitions();
        let Some(reply) = self.query(&messages, &tool_definitions, log).await? else {
            return Ok(EMPTY_RESPONSE.to_string());
        };

        let Some(call) = reply.first_tool_call().cloned() else {
            return Ok(or_completed(reply.content));
        };

        let tool_name = call.function.name.clone();
        let Some(tool) = self.tools.get(&tool_name) else {
            tracing::warn!(agent = %self.name, "model requested unknown tool {tool_name}");
            return Ok(format!("Error: Tool {tool_name} not found."));
        };

        if reply.tool_calls.as_ref().map_or(0, Vec::len) > 1 {
            tracing::debug!(agent = %self.name, "servicing only the first of several tool calls");
        }

        let result = match call.parse_arguments() {
            Ok(args) => {
                log.log(&format!(
                    "Calling Tool: {tool_name} with args: {}",
                    preview(&args.to_string())
                ));
                match tool.execute(args).await {
                    Ok(value) => {
                        let rendered = stringify_result(&value);
                        log.log(&format!("Tool Result: {}", preview(&rendered)));
                        rendered
                    }
                    Err(e) => {
                        let rendered = format!("Tool Execution Error: {e}");
                        tracing::warn!(agent = %self.name, "{rendered}");
                        log.log(&rendered);
                        rendered
                    }
                }
            }
            Err(e) => {
                let rendered = format!("Tool Execution Error: invalid arguments for {tool_name}: {e}");
                tracing::warn!(agent = %self.name, "{rendered}");
                log.log(&rendered);
                rendered
            }
        };

        messages.push(Message::assistant_with_tools(reply.content, vec![call.clone()]));
        messages.push(Message::tool_result(call.id, result));

        // Summary turn: tools are withheld so the model answers in prose.
        let summary = self.query(&messages, &[], log).await?;
        Ok(summary.map_or_else(|| EMPTY_RESPONSE.to_string(), |m| or_completed(m.content)))
    }

    /// One model round-trip. Streams when enabled; a streamed tool-call
    /// fragment forces a fresh non-streamed request so the call can be parsed.
    async fn query(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        log: &mut dyn LogSink,
    ) -> Result<Option<Message>> {
        if self.streaming {
            let mut forward = |sentence: &str| log.log(sentence);
            match self.model.complete_streaming(messages, tools, &mut forward).await? {
                Streamed::Text(content) => return Ok(Some(Message::assistant(content))),
                Streamed::ToolCallPending => {}
            }
        }
        Ok(self.model.complete(messages, tools).await?.choice)
    }
}

/// The reply text [`Agent::run`] substitutes for a failed turn.
pub fn failure_text(e: &JuraiError) -> String {
    if e.is_malformed_response() {
        INCOMPLETE_RESPONSE.to_string()
    } else {
        format!("Agent failed: {e}")
    }
}

fn compose_user_message(message: &str, context: Option<&Value>) -> Result<String> {
    match context {
        Some(context) => Ok(format!(
            "{message}\n\nContext:\n{}",
            serde_json::to_string_pretty(context)?
        )),
        None => Ok(message.to_string()),
    }
}

fn or_completed(content: String) -> String {
    if content.trim().is_empty() {
        EMPTY_RESPONSE.to_string()
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_appends_pretty_context() {
        let context = serde_json::json!({"feature": "Chat Translation", "region": "EU"});
        let composed = compose_user_message("Draft it.", Some(&context)).unwrap();
        assert!(composed.starts_with("Draft it.\n\nContext:\n{"));
        assert!(composed.contains("\"region\": \"EU\""));
        assert_eq!(compose_user_message("Draft it.", None).unwrap(), "Draft it.");
    }

    #[test]
    fn test_failure_text() {
        let api = JuraiError::Api { status: 429, message: "slow down".into() };
        assert_eq!(failure_text(&api), "Agent failed: Provider API error (429): slow down");
        assert_eq!(
            failure_text(&JuraiError::MalformedResponse("no message".into())),
            INCOMPLETE_RESPONSE
        );
    }

    #[test]
    fn test_blank_content_becomes_completion_marker() {
        assert_eq!(or_completed("  \n".to_string()), EMPTY_RESPONSE);
        assert_eq!(or_completed("ok".to_string()), "ok");
    }
}
