use crate::constants::deliberation::SENTINEL_PHRASE;
use crate::error::{JuraiError, Result};
use std::path::Path;

const JURY_PROMPT: &str = r#"You are a Jury Agent screening a product feature for geo-specific legal compliance.
The feature name, description, target region and relevant legislative excerpts are in the context you receive.
Decide whether the feature needs region-specific compliance logic and ground every claim in the excerpts,
citing article and section numbers. Never invent citations; list uncertainties under "open_questions".
If a critique is provided, address each point and return the full revised report.
Respond with JSON only:
{"feature": string, "regions_affected": [string], "needs_geo_specific_logic": boolean,
 "regulations": [{"name": string, "citation": string, "requirement": string}],
 "reasoning": string, "confidence": number, "open_questions": [string]}"#;

const CRITIC_PROMPT: &str = r#"You are a Critic reviewing a Jury Agent's compliance report.
You receive the original task and the jury report. Check that every regulatory claim carries a precise
citation, that the reasoning is clear and product-oriented, that confidence and open questions are stated,
and that the report addresses the target region. List concrete, actionable fixes.
If the report needs no changes, reply with exactly this sentence and nothing else: "#;

const JUDGE_PROMPT: &str = r#"You are the Judge. Merge the jury's final report into one consolidated verdict.
Do not add new evidence. Prefer the most restrictive interpretation where findings conflict,
deduplicate regulations and keep every citation.
Respond with a single JSON object only, starting with { and ending with }:
{"feature": string, "needs_geo_specific_logic": boolean, "confidence": number, "risk_score": number,
 "compliance_score": number, "summary": string, "regions_affected": [string],
 "issues": [{"title": string, "description": string, "severity": string, "risk_score": number,
             "category": string, "impact": string, "remediation": string}],
 "evidence_cited": [{"source": string, "citation": string, "content": string, "jurisdiction": string}],
 "laws_snapshot": [{"name": string, "citation": string}]}"#;

/// Instructions for the three roles. Treated as opaque text by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub jury: String,
    pub critic: String,
    pub judge: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self::with_sentinel(SENTINEL_PHRASE)
    }
}

impl Prompts {
    /// Default instructions, with the critic told to answer `sentinel` when
    /// it has nothing to fix.
    pub fn with_sentinel(sentinel: &str) -> Self {
        Self {
            jury: JURY_PROMPT.to_string(),
            critic: format!("{CRITIC_PROMPT}{}", sentinel.trim()),
            judge: JUDGE_PROMPT.to_string(),
        }
    }

    /// Read an instruction from disk.
    pub fn load(path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            JuraiError::Config(format!("Cannot read prompt file {}: {e}", path.display()))
        })?;
        if text.trim().is_empty() {
            return Err(JuraiError::Config(format!("Prompt file {} is empty", path.display())));
        }
        Ok(text)
    }
}
