use crate::agent::{failure_text, Agent};
use crate::constants::deliberation as c;
use crate::deliberation::prompts::Prompts;
use crate::deliberation::refine::DeliberationLoop;
use crate::deliberation::trace::{StepLog, Trace};
use crate::events::{EventKind, EventSink, ProgressEvent};
use crate::llm::ModelClient;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Drafts and refines the compliance report.
    Jury,
    /// Reviews each draft.
    Critic,
    /// Turns the final report into the verdict.
    Judge,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Jury, AgentRole::Critic, AgentRole::Judge];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Jury => "jury",
            AgentRole::Critic => "critic",
            AgentRole::Judge => "judge",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the agents of one run from injected model clients.
///
/// Only the jury gets the tool registry; the critic and judge work from the
/// context they are handed.
#[derive(Clone)]
pub struct AgentFactory {
    jury_model: ModelClient,
    critic_model: ModelClient,
    judge_model: ModelClient,
    prompts: Prompts,
    tools: Arc<ToolRegistry>,
    streaming: bool,
}

impl AgentFactory {
    pub fn new(jury_model: ModelClient, critic_model: ModelClient, judge_model: ModelClient) -> Self {
        Self {
            jury_model,
            critic_model,
            judge_model,
            prompts: Prompts::default(),
            tools: Arc::new(ToolRegistry::new()),
            streaming: true,
        }
    }

    /// Same model for every role.
    pub fn uniform(model: ModelClient) -> Self {
        Self::new(model.clone(), model.clone(), model)
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn jury(&self, name: &str) -> Agent {
        Agent::new(name, self.prompts.jury.as_str(), self.jury_model.clone())
            .with_tools(self.tools.clone())
            .with_streaming(self.streaming)
    }

    pub fn critic(&self, name: &str) -> Agent {
        Agent::new(name, self.prompts.critic.as_str(), self.critic_model.clone())
            .with_streaming(self.streaming)
    }

    pub fn judge(&self, name: &str) -> Agent {
        Agent::new(name, self.prompts.judge.as_str(), self.judge_model.clone())
            .with_streaming(self.streaming)
    }

    /// `role -> provider/model`, for run metadata.
    pub fn models_used(&self) -> BTreeMap<AgentRole, String> {
        AgentRole::ALL
            .into_iter()
            .map(|role| (role, self.model(role).config().label()))
            .collect()
    }

    fn model(&self, role: AgentRole) -> &ModelClient {
        match role {
            AgentRole::Jury => &self.jury_model,
            AgentRole::Critic => &self.critic_model,
            AgentRole::Judge => &self.judge_model,
        }
    }
}

/// What the orchestrator hands back: the judge's raw text plus the trace.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub raw_verdict: String,
    pub trace: Trace,
    /// Whether the critic accepted a draft before the budget ran out.
    pub converged: bool,
    /// Set when the judge's model call failed. `raw_verdict` then holds the
    /// failure text, not a verdict.
    pub judge_error: Option<String>,
}

/// Jury/critic deliberation followed by the judge, strictly in sequence.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    factory: AgentFactory,
    deliberation: DeliberationLoop,
}

impl PipelineOrchestrator {
    pub fn new(factory: AgentFactory, deliberation: DeliberationLoop) -> Self {
        Self { factory, deliberation }
    }

    pub fn factory(&self) -> &AgentFactory {
        &self.factory
    }

    pub fn deliberation(&self) -> &DeliberationLoop {
        &self.deliberation
    }

    pub async fn run(&self, task_context: &Value, sink: &EventSink) -> PipelineOutcome {
        tracing::info!("Pipeline starting");

        let jury = self.factory.jury(c::JURY_NAME);
        let critic = self.factory.critic(c::CRITIC_NAME);
        let deliberation = self
            .deliberation
            .deliberate(&jury, &critic, task_context, sink)
            .await;

        let mut trace = Trace::new();
        trace.extend(deliberation.trace);

        let judge = self.factory.judge(c::JUDGE_NAME);
        sink.emit(ProgressEvent::milestone(
            EventKind::JudgeThinking,
            format!("{} is producing final verdict...", judge.name()),
        ));
        let context = serde_json::json!({
            "original_task": task_context,
            "final_report": deliberation.report,
        });
        let mut log = StepLog::new(EventKind::JudgeThinking, sink);
        let (raw_verdict, judge_error) = match judge
            .run_checked(c::VERDICT_TASK, Some(&context), Some(&mut log))
            .await
        {
            Ok(text) => (text, None),
            Err(e) => (failure_text(&e), Some(e.to_string())),
        };
        sink.emit(ProgressEvent::verdict(raw_verdict.as_str()));
        trace.push(judge.name(), c::STEP_FINAL_VERDICT, raw_verdict.as_str(), log.into_lines());

        tracing::info!(
            "Pipeline finished: {} steps, {} critique round(s), converged={}",
            trace.len(),
            deliberation.iterations,
            deliberation.converged
        );

        PipelineOutcome {
            raw_verdict,
            trace,
            converged: deliberation.converged,
            judge_error,
        }
    }
}
