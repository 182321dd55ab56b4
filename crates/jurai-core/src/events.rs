//! Progress events emitted while a deliberation runs.
//!
//! Producers call [`EventSink::emit`] synchronously from wherever they are in
//! the call chain; what happens to the event (dropped, printed, forwarded to
//! another task) is up to whoever built the sink.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The six canonical event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JuryThinking,
    JuryReport,
    CriticThinking,
    CriticFeedback,
    JudgeThinking,
    JudgeVerdict,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JuryThinking => "jury_thinking",
            EventKind::JuryReport => "jury_report",
            EventKind::CriticThinking => "critic_thinking",
            EventKind::CriticFeedback => "critic_feedback",
            EventKind::JudgeThinking => "judge_thinking",
            EventKind::JudgeVerdict => "judge_verdict",
        }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(
            self,
            EventKind::JuryThinking | EventKind::CriticThinking | EventKind::JudgeThinking
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub data: Map<String, Value>,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, data: Map<String, Value>) -> Self {
        Self { kind, data }
    }

    /// A milestone such as "Critic is checking iteration 2...".
    pub fn milestone(kind: EventKind, msg: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("msg".into(), Value::String(msg.into()));
        Self::new(kind, data)
    }

    /// A streamed thought fragment; belongs to the current step's log.
    pub fn log_line(kind: EventKind, msg: impl Into<String>) -> Self {
        let mut event = Self::milestone(kind, msg);
        event.data.insert("is_log".into(), Value::Bool(true));
        event
    }

    pub fn report(report: impl Into<String>) -> Self {
        Self::single(EventKind::JuryReport, "report", report.into())
    }

    pub fn critique(critique: impl Into<String>) -> Self {
        Self::single(EventKind::CriticFeedback, "critique", critique.into())
    }

    pub fn verdict(verdict: impl Into<String>) -> Self {
        Self::single(EventKind::JudgeVerdict, "verdict", verdict.into())
    }

    fn single(kind: EventKind, key: &str, value: String) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), Value::String(value));
        Self::new(kind, data)
    }

    pub fn is_log(&self) -> bool {
        self.data.get("is_log").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The `msg` payload of thinking events.
    pub fn message(&self) -> Option<&str> {
        self.data.get("msg").and_then(Value::as_str)
    }
}

type Callback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Synchronous progress callback shared by everything in one run.
#[derive(Clone, Default)]
pub struct EventSink {
    callback: Option<Callback>,
}

impl EventSink {
    pub fn new(callback: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// A sink that discards everything.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("connected", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_serializes_with_canonical_name() {
        let event = ProgressEvent::log_line(EventKind::CriticThinking, "Checking citations.");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "critic_thinking");
        assert_eq!(json["data"]["msg"], "Checking citations.");
        assert_eq!(json["data"]["is_log"], true);
        assert!(event.is_log());
    }

    #[test]
    fn test_milestone_is_not_a_log_line() {
        let event = ProgressEvent::milestone(EventKind::JudgeThinking, "Judge is producing final verdict...");
        assert!(!event.is_log());
        assert_eq!(event.message(), Some("Judge is producing final verdict..."));
        assert!(event.kind.is_thinking());
        assert!(!EventKind::JudgeVerdict.is_thinking());
    }

    #[test]
    fn test_sink_forwards_and_noop_discards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            EventSink::new(move |event| seen.lock().unwrap().push(event.kind))
        };
        sink.emit(ProgressEvent::report("draft"));
        sink.clone().emit(ProgressEvent::critique("fix citations"));
        EventSink::noop().emit(ProgressEvent::verdict("{}"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::JuryReport, EventKind::CriticFeedback]
        );
    }
}
