/// JurAI: centralized constants.
/// Magic strings and limits used across the engine live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_TOGETHER_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";
    pub const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
    pub const DEFAULT_OLLAMA_MODEL: &str = "mistral:7b-instruct";
    pub const DEFAULT_LMSTUDIO_MODEL: &str = "local-model";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
    pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz";
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
    pub const LMSTUDIO_BASE_URL: &str = "http://localhost:1234";
}

// ─── Model call defaults ──────────────────────────────────────────────────────

pub mod defaults {
    /// Free-tier providers rate-limit aggressively, so the budget is high.
    pub const MODEL_RETRIES: u32 = 10;
    pub const RETRY_BACKOFF_MS: u64 = 500;
    pub const RETRY_BACKOFF_CAP_MS: u64 = 8_000;
    pub const TEMPERATURE: f32 = 0.2;
    pub const MAX_TOKENS: u32 = 512;
    pub const MAX_ITERATIONS: usize = 2;
    pub const COURTESY_DELAY_MS: u64 = 1_000;
    pub const RETRIEVAL_K: usize = 3;
    pub const PREVIEW_CHARS: usize = 100;
    pub const API_KEY_ENV: &str = "GROQ_API_KEY";
    pub const PROVIDER_ENV: &str = "JURAI_PROVIDER";
}

// ─── Deliberation ─────────────────────────────────────────────────────────────

pub mod deliberation {
    /// Critic output that ends the refine loop.
    pub const SENTINEL_PHRASE: &str = "No major issues found.";

    pub const JURY_NAME: &str = "Jury_Primary";
    pub const CRITIC_NAME: &str = "Critic_Reviewer";
    pub const JUDGE_NAME: &str = "Judge";

    pub const DRAFT_TASK: &str = "Generate a compliance report based on the provided context.";
    pub const CRITIQUE_TASK: &str = "Review this jury report against the original requirements.";
    pub const REFINE_TASK: &str = "Refine the report based on this critique:";
    pub const VERDICT_TASK: &str = "Review these jury reports and produce a final consolidated verdict.";

    pub const STEP_INITIAL_REPORT: &str = "Initial Report";
    pub const STEP_CRITIQUE: &str = "Critique";
    pub const STEP_REFINEMENT: &str = "Refinement";
    pub const STEP_FINAL_VERDICT: &str = "Final Verdict";
}

// ─── Agent output ─────────────────────────────────────────────────────────────

pub mod agent {
    pub const EMPTY_RESPONSE: &str = "Action completed.";
    pub const INCOMPLETE_RESPONSE: &str = "Agent received an incomplete response from the model.";
    pub const TOOL_CALL_LOG_PREFIX: &str = "Calling Tool";
    pub const TOOL_RESULT_LOG_PREFIX: &str = "Tool Result";
}

// ─── Storage ──────────────────────────────────────────────────────────────────

pub mod storage {
    pub const HISTORY_DIR: &str = "compliance_history";
    pub const VERDICT_FILE_PREFIX: &str = "verdict_";
    pub const CONFIG_DIR: &str = "jurai";
    pub const CONFIG_FILE: &str = "config.toml";
}
