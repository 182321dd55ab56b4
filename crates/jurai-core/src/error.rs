use thiserror::Error;

#[derive(Error, Debug)]
pub enum JuraiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered, but the payload was missing a field we rely on.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Verdict parse error: {0}")]
    Parse(String),

    /// A human review decision the governance rules do not allow.
    #[error("Governance error: {0}")]
    Governance(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl JuraiError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Errors caused by an incomplete provider payload rather than a failed call.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }

    /// Whether another attempt at the same model call could succeed.
    /// Rate limits, timeouts, server errors and transport failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Llm(_) | Self::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, JuraiError>;
