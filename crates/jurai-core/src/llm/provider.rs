use crate::constants::{defaults, endpoints, models};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies an OpenAI-compatible chat-completions provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Groq,
    OpenAI,
    Together,
    OpenRouter,
    Ollama,
    LmStudio,
    Custom(String),
}

impl ProviderId {
    pub fn name(&self) -> &str {
        match self {
            Self::Groq => "groq",
            Self::OpenAI => "openai",
            Self::Together => "together",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
            Self::LmStudio => "lmstudio",
            Self::Custom(name) => name,
        }
    }

    /// Parse a provider name as used in config files, env vars and CLI flags.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "groq" => Self::Groq,
            "openai" => Self::OpenAI,
            "together" => Self::Together,
            "openrouter" => Self::OpenRouter,
            "ollama" => Self::Ollama,
            "lmstudio" | "lm_studio" => Self::LmStudio,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama | Self::LmStudio)
    }

    pub fn needs_api_key(&self) -> bool {
        !self.is_local()
    }

    pub fn default_base_url(&self) -> &str {
        match self {
            Self::Groq => endpoints::GROQ_BASE_URL,
            Self::OpenAI => endpoints::OPENAI_BASE_URL,
            Self::Together => endpoints::TOGETHER_BASE_URL,
            Self::OpenRouter => endpoints::OPENROUTER_BASE_URL,
            Self::Ollama => endpoints::OLLAMA_BASE_URL,
            Self::LmStudio => endpoints::LMSTUDIO_BASE_URL,
            Self::Custom(_) => "",
        }
    }

    pub fn default_api_key_env(&self) -> &str {
        match self {
            Self::Groq => defaults::API_KEY_ENV,
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Together => "TOGETHER_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Ollama | Self::LmStudio | Self::Custom(_) => "",
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            Self::Groq => models::DEFAULT_GROQ_MODEL,
            Self::OpenAI => models::DEFAULT_OPENAI_MODEL,
            Self::Together => models::DEFAULT_TOGETHER_MODEL,
            Self::OpenRouter => models::DEFAULT_OPENROUTER_MODEL,
            Self::Ollama => models::DEFAULT_OLLAMA_MODEL,
            Self::LmStudio | Self::Custom(_) => models::DEFAULT_LMSTUDIO_MODEL,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable description of one model endpoint: who to call, with what
/// sampling parameters, and how hard to retry. Built once (usually by
/// `Settings::model_config`) and handed to a `ModelClient`.
#[derive(Clone)]
pub struct ModelConfig {
    provider: ProviderId,
    model: String,
    api_key: Option<String>,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    retries: u32,
    retry_backoff: Duration,
}

impl ModelConfig {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            base_url: provider.default_base_url().to_string(),
            provider,
            model: model.into(),
            api_key: None,
            temperature: defaults::TEMPERATURE,
            max_tokens: defaults::MAX_TOKENS,
            retries: defaults::MODEL_RETRIES,
            retry_backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// `provider/model`, the form recorded in run metadata.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retries", &self.retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}
