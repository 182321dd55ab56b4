use crate::agent::Agent;
use crate::constants::{defaults, deliberation as c};
use crate::deliberation::trace::{StepLog, Trace};
use crate::events::{EventKind, EventSink, ProgressEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// How a critique is compared against the sentinel phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCheck {
    /// The critique, minus surrounding whitespace, is the sentinel.
    #[default]
    Exact,
    /// The critique mentions the sentinel anywhere (trailing period optional).
    Contains,
}

impl TerminationCheck {
    pub fn is_satisfied(&self, critique: &str, sentinel: &str) -> bool {
        match self {
            TerminationCheck::Exact => critique.trim() == sentinel.trim(),
            TerminationCheck::Contains => {
                let needle = sentinel.trim().trim_end_matches('.');
                !needle.is_empty() && critique.contains(needle)
            }
        }
    }
}

/// States of the draft/critique/refine cycle. Iterations count from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    InitialDraft,
    Critique(usize),
    Refine(usize),
    Terminated,
}

/// Result of one deliberation.
#[derive(Debug, Clone)]
pub struct Deliberation {
    /// The last report the drafter produced.
    pub report: String,
    pub trace: Trace,
    /// Number of critiques performed.
    pub iterations: usize,
    /// Whether the critic signed off before the budget ran out.
    pub converged: bool,
}

/// Bounded draft → critique → refine cycle between two agents.
#[derive(Debug, Clone)]
pub struct DeliberationLoop {
    max_iterations: usize,
    sentinel: String,
    termination: TerminationCheck,
    courtesy_delay: Duration,
}

impl Default for DeliberationLoop {
    fn default() -> Self {
        Self::new(defaults::MAX_ITERATIONS)
    }
}

impl DeliberationLoop {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            sentinel: c::SENTINEL_PHRASE.to_string(),
            termination: TerminationCheck::default(),
            courtesy_delay: Duration::from_millis(defaults::COURTESY_DELAY_MS),
        }
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_termination(mut self, termination: TerminationCheck) -> Self {
        self.termination = termination;
        self
    }

    /// Pause before each critique and refinement, to stay under provider
    /// rate limits. Zero disables it.
    pub fn with_courtesy_delay(mut self, delay: Duration) -> Self {
        self.courtesy_delay = delay;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn termination(&self) -> TerminationCheck {
        self.termination
    }

    pub async fn deliberate(
        &self,
        drafter: &Agent,
        critic: &Agent,
        task_context: &Value,
        sink: &EventSink,
    ) -> Deliberation {
        tracing::info!(
            "=== Starting jury loop: {} (max {} iterations) ===",
            drafter.name(),
            self.max_iterations
        );

        let mut trace = Trace::new();
        let mut report = String::new();
        let mut critique = String::new();
        let mut iterations = 0;
        let mut converged = false;
        let mut state = LoopState::InitialDraft;

        loop {
            state = match state {
                LoopState::InitialDraft => {
                    sink.emit(ProgressEvent::milestone(
                        EventKind::JuryThinking,
                        format!("{} is analyzing context...", drafter.name()),
                    ));
                    let mut log = StepLog::new(EventKind::JuryThinking, sink);
                    report = drafter
                        .run(c::DRAFT_TASK, Some(task_context), Some(&mut log))
                        .await;
                    sink.emit(ProgressEvent::report(report.as_str()));
                    trace.push(drafter.name(), c::STEP_INITIAL_REPORT, report.as_str(), log.into_lines());

                    if self.max_iterations == 0 {
                        LoopState::Terminated
                    } else {
                        LoopState::Critique(1)
                    }
                }

                LoopState::Critique(i) => {
                    tracing::info!("--- Iteration {i}/{} ---", self.max_iterations);
                    self.pause().await;
                    sink.emit(ProgressEvent::milestone(
                        EventKind::CriticThinking,
                        format!("{} is checking iteration {i}...", critic.name()),
                    ));
                    let context = serde_json::json!({
                        "original_task": task_context,
                        "jury_report": report,
                    });
                    let mut log = StepLog::new(EventKind::CriticThinking, sink);
                    critique = critic.run(c::CRITIQUE_TASK, Some(&context), Some(&mut log)).await;
                    sink.emit(ProgressEvent::critique(critique.as_str()));
                    trace.push(
                        critic.name(),
                        format!("{} {i}", c::STEP_CRITIQUE),
                        critique.as_str(),
                        log.into_lines(),
                    );
                    iterations = i;

                    if self.termination.is_satisfied(&critique, &self.sentinel) {
                        tracing::info!(">> Critique passed at iteration {i}, loop complete");
                        converged = true;
                        LoopState::Terminated
                    } else {
                        LoopState::Refine(i)
                    }
                }

                LoopState::Refine(i) => {
                    self.pause().await;
                    sink.emit(ProgressEvent::milestone(
                        EventKind::JuryThinking,
                        format!("{} is refining report based on feedback...", drafter.name()),
                    ));
                    let context = serde_json::json!({
                        "previous_report": report,
                        "critique": critique,
                    });
                    let task = format!("{} {critique}", c::REFINE_TASK);
                    let mut log = StepLog::new(EventKind::JuryThinking, sink);
                    report = drafter.run(&task, Some(&context), Some(&mut log)).await;
                    sink.emit(ProgressEvent::report(report.as_str()));
                    trace.push(
                        drafter.name(),
                        format!("{} {i}", c::STEP_REFINEMENT),
                        report.as_str(),
                        log.into_lines(),
                    );

                    if i < self.max_iterations {
                        LoopState::Critique(i + 1)
                    } else {
                        LoopState::Terminated
                    }
                }

                LoopState::Terminated => break,
            };
        }

        if !converged && self.max_iterations > 0 {
            tracing::info!("Iteration budget exhausted, keeping the last report");
        }

        Deliberation {
            report,
            trace,
            iterations,
            converged,
        }
    }

    async fn pause(&self) {
        if !self.courtesy_delay.is_zero() {
            tokio::time::sleep(self.courtesy_delay).await;
        }
    }
}
