mod pipeline;
mod prompts;
mod refine;
mod trace;

pub use pipeline::{AgentFactory, AgentRole, PipelineOrchestrator, PipelineOutcome};
pub use prompts::Prompts;
pub use refine::{Deliberation, DeliberationLoop, LoopState, TerminationCheck};
pub use trace::{DeliberationStep, StepLog, Trace};
