use super::risk::RiskLevel;
use crate::error::{JuraiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Modified,
}

/// What a human reviewer decided about an AI verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    Approved,
    Rejected,
    Modified,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
            ReviewDecision::Modified => ReviewStatus::Modified,
        }
    }
}

/// Sign-off state of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Governance {
    pub human_review_required: bool,
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub review_reason: Option<String>,
    pub audit_id: Option<String>,
}

impl Governance {
    /// High and Critical risk wait for a reviewer; anything else, including
    /// an unrated assessment, is approved as is.
    pub fn for_risk(level: Option<RiskLevel>) -> Self {
        let required = level.is_some_and(|level| level.needs_human_review());
        Self {
            human_review_required: required,
            review_status: if required {
                ReviewStatus::Pending
            } else {
                ReviewStatus::Approved
            },
            reviewed_by: None,
            review_reason: None,
            audit_id: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            human_review_required: true,
            review_status: ReviewStatus::Pending,
            reviewed_by: None,
            review_reason: None,
            audit_id: None,
        }
    }

    /// Fold a completed human review into these flags.
    pub fn record(&mut self, audit: &AuditRecord) {
        self.review_status = audit.review_status.into();
        self.reviewed_by = Some(audit.reviewed_by.clone());
        self.review_reason = Some(audit.review_reason.clone());
        self.audit_id = Some(audit.audit_id.clone());
    }
}

/// Immutable trace of one human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: String,
    pub ai_verdict: Value,
    pub final_verdict: Value,
    pub review_status: ReviewDecision,
    pub reviewed_by: String,
    pub review_reason: String,
    pub legal_risk: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

/// Apply a human reviewer's decision to an AI verdict.
///
/// High and Critical risk verdicts must be explicitly approved or modified.
/// A modification must carry the edited verdict, which becomes the final one.
pub fn human_override(
    ai_verdict: &Value,
    legal_risk: RiskLevel,
    reviewer_id: &str,
    decision: ReviewDecision,
    reason: &str,
    edited_verdict: Option<Value>,
) -> Result<AuditRecord> {
    if reviewer_id.trim().is_empty() {
        return Err(JuraiError::Governance("A review needs a reviewer id".into()));
    }
    if legal_risk.needs_human_review() && decision == ReviewDecision::Rejected {
        return Err(JuraiError::Governance(format!(
            "{legal_risk} risk verdicts must be explicitly Approved or Modified by a human reviewer"
        )));
    }
    let final_verdict = match (decision, edited_verdict) {
        (_, Some(edited)) => edited,
        (ReviewDecision::Modified, None) => {
            return Err(JuraiError::Governance("A Modified review needs the edited verdict".into()))
        }
        (_, None) => ai_verdict.clone(),
    };

    let record = AuditRecord {
        audit_id: uuid::Uuid::new_v4().to_string(),
        ai_verdict: ai_verdict.clone(),
        final_verdict,
        review_status: decision,
        reviewed_by: reviewer_id.trim().to_string(),
        review_reason: reason.to_string(),
        legal_risk,
        timestamp: Utc::now(),
    };
    tracing::info!(
        "Verdict review {} by {}: {:?} ({legal_risk} risk)",
        record.audit_id,
        record.reviewed_by,
        decision
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_high_risk_cannot_be_rejected() {
        let verdict = json!({"needs_geo_specific_logic": true});
        let err = human_override(&verdict, RiskLevel::Critical, "dpo@corp", ReviewDecision::Rejected, "no", None)
            .unwrap_err();
        assert!(matches!(err, JuraiError::Governance(_)));

        let audit = human_override(&verdict, RiskLevel::Low, "dpo@corp", ReviewDecision::Rejected, "out of scope", None)
            .unwrap();
        assert_eq!(audit.final_verdict, verdict);
        assert_eq!(audit.review_status, ReviewDecision::Rejected);
    }

    #[test]
    fn test_modification_replaces_the_verdict() {
        let verdict = json!({"risk_score": 80});
        let edited = json!({"risk_score": 60});

        assert!(human_override(&verdict, RiskLevel::High, "legal", ReviewDecision::Modified, "fix", None).is_err());

        let audit = human_override(
            &verdict,
            RiskLevel::High,
            " legal ",
            ReviewDecision::Modified,
            "overstated exposure",
            Some(edited.clone()),
        )
        .unwrap();
        assert_eq!(audit.ai_verdict, verdict);
        assert_eq!(audit.final_verdict, edited);
        assert_eq!(audit.reviewed_by, "legal");
        assert!(uuid::Uuid::parse_str(&audit.audit_id).is_ok());

        let mut governance = Governance::for_risk(Some(RiskLevel::High));
        assert_eq!(governance.review_status, ReviewStatus::Pending);
        governance.record(&audit);
        assert_eq!(governance.review_status, ReviewStatus::Modified);
        assert_eq!(governance.audit_id.as_deref(), Some(audit.audit_id.as_str()));
        assert!(governance.human_review_required);
    }

    #[test]
    fn test_review_needs_a_reviewer() {
        let err = human_override(&json!({}), RiskLevel::Low, "  ", ReviewDecision::Approved, "", None).unwrap_err();
        assert!(matches!(err, JuraiError::Governance(_)));
    }
}
