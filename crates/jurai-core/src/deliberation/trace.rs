use crate::agent::LogSink;
use crate::constants::agent::{TOOL_CALL_LOG_PREFIX, TOOL_RESULT_LOG_PREFIX};
use crate::events::{EventKind, EventSink, ProgressEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a deliberation trace. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationStep {
    pub agent: String,
    pub step: String,
    pub content: String,
    pub logs: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only, chronologically ordered record of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    steps: Vec<DeliberationStep>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step stamped now. Timestamps never go backwards, even if the
    /// wall clock does.
    pub fn push(
        &mut self,
        agent: impl Into<String>,
        step: impl Into<String>,
        content: impl Into<String>,
        logs: Vec<String>,
    ) {
        let now = Utc::now();
        let timestamp = match self.steps.last() {
            Some(prev) if prev.timestamp > now => prev.timestamp,
            _ => now,
        };
        self.steps.push(DeliberationStep {
            agent: agent.into(),
            step: step.into(),
            content: content.into(),
            logs,
            timestamp,
        });
    }

    /// Append another trace, e.g. the loop's trace into the pipeline's.
    pub fn extend(&mut self, other: Trace) {
        for mut step in other.steps {
            if let Some(prev) = self.steps.last() {
                step.timestamp = step.timestamp.max(prev.timestamp);
            }
            self.steps.push(step);
        }
    }

    pub fn steps(&self) -> &[DeliberationStep] {
        &self.steps
    }

    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step.as_str()).collect()
    }

    pub fn last(&self) -> Option<&DeliberationStep> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<DeliberationStep> {
        self.steps
    }
}

impl IntoIterator for Trace {
    type Item = DeliberationStep;
    type IntoIter = std::vec::IntoIter<DeliberationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// Per-step log accumulator. A fresh one is created for every step, so lines
/// from one step can never leak into another.
///
/// Every line is kept for the trace. Lines that are not tool bookkeeping are
/// also emitted as `{msg, is_log: true}` thinking events.
pub struct StepLog {
    kind: EventKind,
    sink: EventSink,
    lines: Vec<String>,
}

impl StepLog {
    pub fn new(kind: EventKind, sink: &EventSink) -> Self {
        Self {
            kind,
            sink: sink.clone(),
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl LogSink for StepLog {
    fn log(&mut self, line: &str) {
        self.lines.push(line.to_string());
        if !line.starts_with(TOOL_CALL_LOG_PREFIX) && !line.starts_with(TOOL_RESULT_LOG_PREFIX) {
            self.sink.emit(ProgressEvent::log_line(self.kind, line));
        }
    }
}
