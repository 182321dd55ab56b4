pub mod agent;
pub mod assessment;
pub mod bridge;
pub mod compliance;
pub mod config;
pub mod constants;
pub mod deliberation;
pub mod error;
pub mod events;
pub mod history;
pub mod llm;
pub mod tools;
pub mod verdict;

// Re-export key types
pub use agent::{Agent, LogSink};
pub use assessment::{
    human_override, AuditRecord, ComplianceDiffer, Governance, ReviewDecision, ReviewStatus,
    RiskAssessor, RiskLevel, RiskReview,
};
pub use bridge::{BridgeItem, BridgedRun, EventBridge};
pub use compliance::{ComplianceReport, ComplianceRunner, RunMetadata};
pub use config::Settings;
pub use deliberation::{
    AgentFactory, AgentRole, Deliberation, DeliberationLoop, DeliberationStep,
    PipelineOrchestrator, PipelineOutcome, Prompts, TerminationCheck, Trace,
};
pub use error::{JuraiError, Result};
pub use events::{EventKind, EventSink, ProgressEvent};
pub use history::{FileVerdictStore, VerdictRecord, VerdictStore};
pub use llm::{LlmClient, LlmResponse, Message, ModelClient, ModelConfig, ProviderId, Role, StreamEvent};
pub use tools::{Tool, ToolDefinition, ToolRegistry, ToolResult};
pub use verdict::parse_verdict;
