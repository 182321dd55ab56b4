//! Analysis that runs after a verdict is stored: what changed since the last
//! verdict, how risky the feature is, and the human sign-off that risk calls
//! for.

mod diff;
mod governance;
mod risk;

pub use diff::{diff_failure, ComplianceDiffer};
pub use governance::{human_override, AuditRecord, Governance, ReviewDecision, ReviewStatus};
pub use risk::{RiskAssessor, RiskLevel, RiskReview};

use crate::error::{JuraiError, Result};
use crate::llm::{Message, ModelClient};
use crate::verdict::parse_verdict;
use serde_json::Value;

/// One instruction + JSON payload round-trip whose reply must be a JSON object.
async fn ask_json(model: &ModelClient, instruction: &str, payload: &Value, what: &str) -> Result<Value> {
    let messages = vec![
        Message::system(instruction),
        Message::user(serde_json::to_string_pretty(payload)?),
    ];

    let content = model
        .complete(&messages, &[])
        .await?
        .choice
        .map(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| JuraiError::MalformedResponse(format!("{what} returned no content")))?;

    match parse_verdict(&content) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(JuraiError::Parse(format!("{what} did not return a JSON object"))),
        Err(e) => Err(JuraiError::Parse(format!("{what} did not return valid JSON: {e}"))),
    }
}
