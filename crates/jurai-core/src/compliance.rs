use crate::assessment::{ComplianceDiffer, RiskAssessor, RiskReview};
use crate::deliberation::{AgentRole, PipelineOrchestrator, Trace};
use crate::error::{JuraiError, Result};
use crate::events::EventSink;
use crate::history::{VerdictRecord, VerdictStore};
use crate::verdict::parse_verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub verdict_version: String,
    pub previous_verdict_exists: bool,
    pub jurisdictions_evaluated: Vec<String>,
    pub models_used: BTreeMap<AgentRole, String>,
    /// Whether the critic signed off on the final report.
    pub converged: bool,
}

/// Everything one screening run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub feature_id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub verdict: Value,
    /// The stored verdict this run superseded, if any.
    pub previous_verdict: Option<VerdictRecord>,
    /// How this verdict differs from `previous_verdict`, when there is one
    /// and a differ is configured.
    #[serde(default)]
    pub compliance_diff: Option<Value>,
    #[serde(default)]
    pub risk: Option<RiskReview>,
    pub metadata: RunMetadata,
    pub agent_trace: Trace,
}

/// Runs the agents, decodes the verdict and files it in the history store,
/// then runs whichever post-verdict analysis is configured.
pub struct ComplianceRunner {
    orchestrator: PipelineOrchestrator,
    store: Arc<dyn VerdictStore>,
    differ: Option<ComplianceDiffer>,
    risk: Option<RiskAssessor>,
}

impl ComplianceRunner {
    pub fn new(orchestrator: PipelineOrchestrator, store: Arc<dyn VerdictStore>) -> Self {
        Self {
            orchestrator,
            store,
            differ: None,
            risk: None,
        }
    }

    pub fn with_differ(mut self, differ: ComplianceDiffer) -> Self {
        self.differ = Some(differ);
        self
    }

    pub fn with_risk_assessor(mut self, assessor: RiskAssessor) -> Self {
        self.risk = Some(assessor);
        self
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &dyn VerdictStore {
        self.store.as_ref()
    }

    pub async fn run(&self, context: &Value, sink: &EventSink) -> Result<ComplianceReport> {
        tracing::info!("Starting compliance run");

        let outcome = self.orchestrator.run(context, sink).await;
        if let Some(ref e) = outcome.judge_error {
            tracing::error!("Judge produced no verdict: {e}");
            return Err(JuraiError::Llm(format!("Judge produced no verdict: {e}")));
        }
        let verdict = parse_verdict(&outcome.raw_verdict)?;
        let feature_id = resolve_feature_id(context, &verdict)?;

        let laws_snapshot = match verdict.get("laws_snapshot") {
            Some(Value::Array(laws)) => laws.clone(),
            _ => Vec::new(),
        };
        let (previous, record) = {
            let feature_id = feature_id.clone();
            let verdict = verdict.clone();
            self.with_store(move |store| {
                let previous = store.latest(&feature_id)?;
                let record = store.store(&feature_id, &verdict, laws_snapshot)?;
                Ok((previous, record))
            })
            .await?
        };

        let compliance_diff = match (&self.differ, &previous) {
            (Some(differ), Some(previous)) => Some(differ.diff_or_error(previous, &record).await),
            _ => None,
        };
        let risk = match self.risk {
            Some(ref assessor) => Some(assessor.assess_or_failed(&verdict, context).await),
            None => None,
        };

        let metadata = RunMetadata {
            verdict_version: record.version.clone(),
            previous_verdict_exists: previous.is_some(),
            jurisdictions_evaluated: extract_jurisdictions(&verdict),
            models_used: self.orchestrator.factory().models_used(),
            converged: outcome.converged,
        };

        let run_id = generate_run_id(record.timestamp);
        tracing::info!("Compliance run {run_id} finished for {feature_id} (v{})", record.version);

        Ok(ComplianceReport {
            feature_id,
            run_id,
            timestamp: record.timestamp,
            verdict,
            previous_verdict: previous,
            compliance_diff,
            risk,
            metadata,
            agent_trace: outcome.trace,
        })
    }

    /// Store access does blocking file IO, so it runs on the blocking pool.
    async fn with_store<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn VerdictStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || work(store.as_ref()))
            .await
            .map_err(|e| JuraiError::Worker(format!("verdict store task failed: {e}")))?
    }
}

/// `run_<YYYYmmddTHHMMSSZ>_<6 hex>`
pub fn generate_run_id(at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("run_{}_{}", at.format("%Y%m%dT%H%M%SZ"), &suffix[..6])
}

/// The context's `feature_id`, else the verdict's `feature` or `feature_id`.
pub fn resolve_feature_id(context: &Value, verdict: &Value) -> Result<String> {
    let candidates = [
        context.get("feature_id"),
        verdict.get("feature"),
        verdict.get("feature_id"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .next()
        .ok_or_else(|| JuraiError::Config("feature_id missing in context and verdict".into()))
}

/// Regions named in `regions_affected`, as strings or `{region}` objects,
/// de-duplicated in first-seen order.
pub fn extract_jurisdictions(verdict: &Value) -> Vec<String> {
    let Some(Value::Array(entries)) = verdict.get("regions_affected") else {
        return Vec::new();
    };

    let mut regions: Vec<String> = Vec::new();
    for entry in entries {
        let region = match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("region").and_then(Value::as_str),
            _ => None,
        };
        if let Some(region) = region {
            if !regions.iter().any(|r| r == region) {
                regions.push(region.to_string());
            }
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_id_shape() {
        let at = DateTime::parse_from_rfc3339("2025-08-30T14:05:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = generate_run_id(at);
        assert!(id.starts_with("run_20250830T140509Z_"));
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_feature_id_precedence() {
        let verdict = json!({"feature": "Chat Translation", "feature_id": "chat-v2"});
        assert_eq!(
            resolve_feature_id(&json!({"feature_id": "ctx-1"}), &verdict).unwrap(),
            "ctx-1"
        );
        assert_eq!(resolve_feature_id(&json!({}), &verdict).unwrap(), "Chat Translation");
        assert_eq!(
            resolve_feature_id(&json!({"feature_id": ""}), &json!({"feature_id": "chat-v2"})).unwrap(),
            "chat-v2"
        );
        assert!(matches!(
            resolve_feature_id(&json!({}), &json!({})),
            Err(JuraiError::Config(_))
        ));
    }

    #[test]
    fn test_jurisdictions_mixed_and_deduplicated() {
        let verdict = json!({
            "regions_affected": ["EU", {"region": "US-CA"}, "EU", {"name": "ignored"}, 7, {"region": "US-CA"}]
        });
        assert_eq!(extract_jurisdictions(&verdict), vec!["EU", "US-CA"]);
        assert!(extract_jurisdictions(&json!({"regions_affected": "EU"})).is_empty());
    }
}
