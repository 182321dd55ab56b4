use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::assessment::{ComplianceDiffer, RiskAssessor};
use crate::compliance::ComplianceRunner;
use crate::constants::{defaults, deliberation, storage};
use crate::deliberation::{
    AgentFactory, AgentRole, DeliberationLoop, PipelineOrchestrator, Prompts, TerminationCheck,
};
use crate::error::{JuraiError, Result};
use crate::history::FileVerdictStore;
use crate::llm::{ModelClient, ModelConfig, ProviderId};
use crate::tools::{KeywordRetriever, RetrieveTool, ToolRegistry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub deliberation: DeliberationSettings,
    #[serde(default)]
    pub prompts: PromptSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub jury: RoleModel,
    #[serde(default)]
    pub critic: RoleModel,
    #[serde(default)]
    pub judge: RoleModel,
}

impl ModelSettings {
    pub fn role(&self, role: AgentRole) -> &RoleModel {
        match role {
            AgentRole::Jury => &self.jury,
            AgentRole::Critic => &self.critic,
            AgentRole::Judge => &self.judge,
        }
    }

    pub fn role_mut(&mut self, role: AgentRole) -> &mut RoleModel {
        match role {
            AgentRole::Jury => &mut self.jury,
            AgentRole::Critic => &mut self.critic,
            AgentRole::Judge => &mut self.judge,
        }
    }
}

/// Model endpoint for one role. Unset fields fall back to the provider's
/// defaults (for Groq, the key comes from `GROQ_API_KEY`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleModel {
    pub provider: String,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RoleModel {
    fn default() -> Self {
        Self {
            provider: ProviderId::Groq.name().to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            temperature: defaults::TEMPERATURE,
            max_tokens: defaults::MAX_TOKENS,
            retries: defaults::MODEL_RETRIES,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliberationSettings {
    pub max_iterations: usize,
    pub courtesy_delay_ms: u64,
    pub streaming: bool,
    pub sentinel: String,
    pub termination: TerminationCheck,
}

impl Default for DeliberationSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            courtesy_delay_ms: defaults::COURTESY_DELAY_MS,
            streaming: true,
            sentinel: deliberation::SENTINEL_PHRASE.to_string(),
            termination: TerminationCheck::default(),
        }
    }
}

/// Instruction overrides. A file wins over inline text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub jury: Option<String>,
    pub jury_file: Option<PathBuf>,
    pub critic: Option<String>,
    pub critic_file: Option<PathBuf>,
    pub judge: Option<String>,
    pub judge_file: Option<PathBuf>,
    pub diff: Option<String>,
    pub diff_file: Option<PathBuf>,
    pub risk: Option<String>,
    pub risk_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    /// JSON array of `{content, metadata}` passages. No retrieval tool
    /// without it.
    pub corpus: Option<PathBuf>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: defaults::RETRIEVAL_K,
            corpus: None,
        }
    }
}

/// Post-verdict steps. Both use the judge's model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Explain how a verdict differs from the one it supersedes.
    pub compliance_diff: bool,
    /// Rate the verdict's legal risk and derive review flags.
    pub risk: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            compliance_diff: true,
            risk: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(storage::CONFIG_DIR)
            .join(storage::CONFIG_FILE)
    }

    /// Settings from the default config file, or defaults if there is none
    /// or it cannot be read.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {e}", config_path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| JuraiError::Config(format!("Invalid config {}: {e}", path.display())))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| JuraiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Point every role at `provider` and/or `model`. Switching provider
    /// drops role-specific model, key variable and URL.
    pub fn override_models(&mut self, provider: Option<&str>, model: Option<&str>) {
        for role in AgentRole::ALL {
            let entry = self.models.role_mut(role);
            if let Some(provider) = provider {
                if !provider.trim().eq_ignore_ascii_case(&entry.provider) {
                    entry.provider = provider.trim().to_lowercase();
                    entry.model = None;
                    entry.api_key_env = None;
                    entry.base_url = None;
                }
            }
            if let Some(model) = model {
                entry.model = Some(model.to_string());
            }
        }
    }

    /// The immutable model config for `role`, with `JURAI_PROVIDER` and the
    /// role's API key variable read from the process environment.
    pub fn model_config(&self, role: AgentRole) -> ModelConfig {
        self.model_config_with_env(role, |name| std::env::var(name).ok())
    }

    pub(crate) fn model_config_with_env(
        &self,
        role: AgentRole,
        env: impl Fn(&str) -> Option<String>,
    ) -> ModelConfig {
        let entry = self.models.role(role);
        let forced = env(defaults::PROVIDER_ENV)
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty() && *p != entry.provider.to_lowercase());

        let provider = ProviderId::from_name(forced.as_deref().unwrap_or(&entry.provider));
        let (model, key_env, base_url) = match forced {
            Some(_) => (None, None, None),
            None => (
                entry.model.clone(),
                entry.api_key_env.clone(),
                entry.base_url.clone(),
            ),
        };

        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        let key_env = key_env.unwrap_or_else(|| provider.default_api_key_env().to_string());
        let base_url = base_url.unwrap_or_else(|| provider.default_base_url().to_string());

        let mut config = ModelConfig::new(provider, model)
            .with_base_url(base_url)
            .with_temperature(entry.temperature)
            .with_max_tokens(entry.max_tokens)
            .with_retries(entry.retries)
            .with_retry_backoff(Duration::from_millis(entry.retry_backoff_ms));
        if !key_env.is_empty() {
            if let Some(key) = env(&key_env).filter(|k| !k.is_empty()) {
                config = config.with_api_key(key);
            }
        }
        config
    }

    pub fn deliberation_loop(&self) -> DeliberationLoop {
        let d = &self.deliberation;
        DeliberationLoop::new(d.max_iterations)
            .with_sentinel(d.sentinel.as_str())
            .with_termination(d.termination)
            .with_courtesy_delay(Duration::from_millis(d.courtesy_delay_ms))
    }

    pub fn prompts(&self) -> Result<Prompts> {
        let fallback = Prompts::with_sentinel(&self.deliberation.sentinel);
        let p = &self.prompts;
        Ok(Prompts {
            jury: pick_prompt(&p.jury, &p.jury_file, fallback.jury)?,
            critic: pick_prompt(&p.critic, &p.critic_file, fallback.critic)?,
            judge: pick_prompt(&p.judge, &p.judge_file, fallback.judge)?,
        })
    }

    /// The jury's tools: `naiverag_retrieve` when a corpus is configured.
    pub fn build_tools(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        if let Some(ref corpus) = self.retrieval.corpus {
            let retriever = KeywordRetriever::from_file(corpus)?;
            registry.register(Box::new(
                RetrieveTool::new(Arc::new(retriever)).with_k(self.retrieval.k),
            ))?;
        }
        Ok(registry)
    }

    pub fn build_orchestrator(&self) -> Result<PipelineOrchestrator> {
        let client = |role| ModelClient::from_config(self.model_config(role));
        let factory = AgentFactory::new(
            client(AgentRole::Jury)?,
            client(AgentRole::Critic)?,
            client(AgentRole::Judge)?,
        )
        .with_prompts(self.prompts()?)
        .with_tools(Arc::new(self.build_tools()?))
        .with_streaming(self.deliberation.streaming);

        Ok(PipelineOrchestrator::new(factory, self.deliberation_loop()))
    }

    pub fn history_store(&self) -> Result<FileVerdictStore> {
        let dir = match self.history.dir {
            Some(ref dir) => dir.clone(),
            None => FileVerdictStore::default_dir()?,
        };
        Ok(FileVerdictStore::new(dir))
    }

    pub fn build_runner(&self) -> Result<ComplianceRunner> {
        let orchestrator = self.build_orchestrator()?;
        let judge_model = ModelClient::from_config(self.model_config(AgentRole::Judge))?;
        let p = &self.prompts;

        let mut runner = ComplianceRunner::new(orchestrator, Arc::new(self.history_store()?));
        if self.analysis.compliance_diff {
            let mut differ = ComplianceDiffer::new(judge_model.clone());
            if let Some(instruction) = pick_override(&p.diff, &p.diff_file)? {
                differ = differ.with_instruction(instruction);
            }
            runner = runner.with_differ(differ);
        }
        if self.analysis.risk {
            let mut assessor = RiskAssessor::new(judge_model);
            if let Some(instruction) = pick_override(&p.risk, &p.risk_file)? {
                assessor = assessor.with_instruction(instruction);
            }
            runner = runner.with_risk_assessor(assessor);
        }
        Ok(runner)
    }
}

fn pick_prompt(inline: &Option<String>, file: &Option<PathBuf>, default: String) -> Result<String> {
    Ok(pick_override(inline, file)?.unwrap_or(default))
}

fn pick_override(inline: &Option<String>, file: &Option<PathBuf>) -> Result<Option<String>> {
    if let Some(path) = file {
        return Prompts::load(path).map(Some);
    }
    Ok(inline.as_ref().filter(|text| !text.trim().is_empty()).cloned())
}
