use super::ask_json;
use super::governance::Governance;
use crate::error::Result;
use crate::llm::ModelClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

const RISK_PROMPT: &str = r#"You are a legal risk assessment engine. You receive a finalized compliance verdict and the
feature context it was produced for. Produce an explainable risk assessment for executives, compliance
teams and automated governance. Reason from the verdict's content; do not apply fixed rules or weights.
Levels, as guidance: Low (minor obligations, unlikely enforcement), Moderate (clear obligations,
limited exposure), High (strong enforcement risk, material exposure), Critical (severe violations,
major penalties or bans possible). State uncertainty explicitly. Only cite laws and clauses that
appear in the verdict.
Respond with JSON only, no markdown:
{"risk_assessment": {"overall_risk": "Low | Moderate | High | Critical", "risk_score": number,
  "confidence": number, "summary": string,
  "drivers": [{"law": string, "jurisdiction": string, "clause": string, "reason": string,
               "severity": "Low | Moderate | High | Critical"}]}}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// High and Critical findings need a human before they are acted on.
    pub fn needs_human_review(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A risk assessment and the governance flags derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReview {
    /// The model's assessment: `overall_risk`, `risk_score`, `drivers`, ...
    pub risk_assessment: Value,
    pub governance: Governance,
}

impl RiskReview {
    pub fn from_assessment(risk_assessment: Value) -> Self {
        let level = risk_assessment
            .get("overall_risk")
            .and_then(Value::as_str)
            .and_then(RiskLevel::parse);
        Self {
            risk_assessment,
            governance: Governance::for_risk(level),
        }
    }

    /// The review reported when the assessment could not be produced. The
    /// risk is unknown, so a human has to look at it.
    pub fn failed(error: &str) -> Self {
        Self {
            risk_assessment: json!({
                "summary": "Risk assessment failed",
                "error": error,
            }),
            governance: Governance::pending(),
        }
    }

    pub fn overall_risk(&self) -> Option<RiskLevel> {
        self.risk_assessment
            .get("overall_risk")
            .and_then(Value::as_str)
            .and_then(RiskLevel::parse)
    }
}

/// Rates the legal risk of a stored verdict with one model call.
#[derive(Clone)]
pub struct RiskAssessor {
    model: ModelClient,
    instruction: String,
}

impl RiskAssessor {
    pub fn new(model: ModelClient) -> Self {
        Self {
            model,
            instruction: RISK_PROMPT.to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    pub async fn assess(&self, verdict: &Value, feature_context: &Value) -> Result<RiskReview> {
        let payload = json!({
            "verdict": verdict,
            "feature_context": feature_context,
        });
        let mut output = ask_json(&self.model, &self.instruction, &payload, "Risk assessment").await?;

        // accept the assessment with or without its wrapper object
        let wrapped = output.get("risk_assessment").is_some_and(Value::is_object);
        let assessment = if wrapped {
            output["risk_assessment"].take()
        } else {
            output
        };
        let review = RiskReview::from_assessment(assessment);
        tracing::info!(
            "Risk assessed as {}, human review required: {}",
            review.overall_risk().map_or("unrated", |level| level.as_str()),
            review.governance.human_review_required
        );
        Ok(review)
    }

    /// [`assess`](Self::assess), with a failure reported as a review that
    /// awaits a human.
    pub async fn assess_or_failed(&self, verdict: &Value, feature_context: &Value) -> RiskReview {
        match self.assess(verdict, feature_context).await {
            Ok(review) => review,
            Err(e) => {
                tracing::error!("Risk reasoning failed: {e}");
                RiskReview::failed(&e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_parsing() {
        assert_eq!(RiskLevel::parse(" high "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("CRITICAL"), Some(RiskLevel::Critical));
        assert_eq!(RiskLevel::parse("Low | Moderate"), None);
        assert!(RiskLevel::Critical.needs_human_review());
        assert!(!RiskLevel::Moderate.needs_human_review());
        assert!(RiskLevel::Low < RiskLevel::Critical);
    }

    #[test]
    fn test_review_flags_follow_overall_risk() {
        let review = RiskReview::from_assessment(json!({"overall_risk": "High", "risk_score": 72}));
        assert_eq!(review.overall_risk(), Some(RiskLevel::High));
        assert!(review.governance.human_review_required);

        let review = RiskReview::from_assessment(json!({"overall_risk": "Low"}));
        assert!(!review.governance.human_review_required);

        // no rating at all is not escalated
        let review = RiskReview::from_assessment(json!({"summary": "?"}));
        assert!(!review.governance.human_review_required);

        let failed = RiskReview::failed("timeout");
        assert!(failed.governance.human_review_required);
        assert_eq!(failed.risk_assessment["error"], "timeout");
    }
}
