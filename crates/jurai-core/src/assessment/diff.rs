use super::ask_json;
use crate::error::Result;
use crate::history::VerdictRecord;
use crate::llm::ModelClient;
use serde_json::{json, Value};

const DIFF_PROMPT: &str = r#"You are a compliance change analyst. You receive two compliance verdicts for the same feature,
previous and current, plus the laws snapshot each was based on.
Explain why the compliance outcome changed. Reason about meaning, not a field-by-field JSON diff,
and leave out anything that did not change. Separate law changes (new versions, clauses or
interpretations) from feature changes (logic, data handling, UI, workflows) and say how each moved the risk.
If nothing meaningful changed, say so in "summary". Never invent laws, clauses or versions.
Respond with JSON only:
{"compliance_diff": {"summary": string,
  "law_changes": [{"law": string, "jurisdiction": string, "clause": string,
                   "old_interpretation": string, "new_interpretation": string, "impact": string}],
  "feature_changes": [{"feature_part": string, "description": string, "compliance_impact": string}],
  "risk_shift": {"previous_risk": string, "current_risk": string, "reason": string}}}"#;

/// Explains, with one model call, how a new verdict differs from the one it
/// supersedes.
#[derive(Clone)]
pub struct ComplianceDiffer {
    model: ModelClient,
    instruction: String,
}

impl ComplianceDiffer {
    pub fn new(model: ModelClient) -> Self {
        Self {
            model,
            instruction: DIFF_PROMPT.to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn model(&self) -> &ModelClient {
        &self.model
    }

    pub async fn diff(&self, previous: &VerdictRecord, current: &VerdictRecord) -> Result<Value> {
        let payload = json!({
            "previous_verdict": previous.verdict,
            "current_verdict": current.verdict,
            "previous_laws_snapshot": previous.laws_snapshot,
            "current_laws_snapshot": current.laws_snapshot,
        });
        ask_json(&self.model, &self.instruction, &payload, "Compliance diff").await
    }

    /// [`diff`](Self::diff), with a failure reported in place of the diff.
    pub async fn diff_or_error(&self, previous: &VerdictRecord, current: &VerdictRecord) -> Value {
        match self.diff(previous, current).await {
            Ok(diff) => diff,
            Err(e) => {
                tracing::error!("Diff generation failed for {}: {e}", current.feature_id);
                diff_failure(&e.to_string())
            }
        }
    }
}

/// The diff reported when generating one failed.
pub fn diff_failure(error: &str) -> Value {
    json!({
        "compliance_diff": {
            "summary": "Diff generation failed",
            "error": error,
        }
    })
}
