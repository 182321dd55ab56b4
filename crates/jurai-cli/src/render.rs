use jurai_core::{ComplianceReport, EventKind, ProgressEvent};
use serde_json::Value;
use std::fmt::Write;

/// One progress event as terminal text. `None` for events with nothing worth
/// printing.
pub fn render_event(event: &ProgressEvent) -> Option<String> {
    if event.kind.is_thinking() {
        let msg = event.message()?;
        return Some(if event.is_log() {
            format!("    {msg}")
        } else {
            format!("[{}] {msg}", speaker(event.kind))
        });
    }

    let (title, key) = match event.kind {
        EventKind::JuryReport => ("Jury report", "report"),
        EventKind::CriticFeedback => ("Critique", "critique"),
        // the verdict is printed once the run completes
        EventKind::JudgeVerdict => return Some(format!("[{}] verdict ready", speaker(event.kind))),
        _ => return None,
    };
    let body = event.data.get(key).and_then(Value::as_str)?;
    Some(format!("── {title} ──\n{}", body.trim()))
}

fn speaker(kind: EventKind) -> &'static str {
    match kind {
        EventKind::JuryThinking | EventKind::JuryReport => "jury",
        EventKind::CriticThinking | EventKind::CriticFeedback => "critic",
        EventKind::JudgeThinking | EventKind::JudgeVerdict => "judge",
    }
}

/// Human-readable summary of a finished run.
pub fn render_report(report: &ComplianceReport) -> String {
    let meta = &report.metadata;
    let mut out = String::new();
    let _ = writeln!(out, "Feature:       {}", report.feature_id);
    let _ = writeln!(out, "Run:           {}", report.run_id);
    let _ = writeln!(
        out,
        "Version:       {}{}",
        meta.verdict_version,
        if meta.previous_verdict_exists { " (supersedes a previous verdict)" } else { "" }
    );
    if !meta.jurisdictions_evaluated.is_empty() {
        let _ = writeln!(out, "Jurisdictions: {}", meta.jurisdictions_evaluated.join(", "));
    }
    let _ = writeln!(
        out,
        "Critic:        {}",
        if meta.converged { "accepted the report" } else { "iteration budget exhausted" }
    );
    let _ = writeln!(out, "Steps:         {}", report.agent_trace.len());
    if let Some(ref risk) = report.risk {
        let level = risk.overall_risk().map_or("unrated", |level| level.as_str());
        let review = if risk.governance.human_review_required {
            "human review required"
        } else {
            "no review needed"
        };
        let _ = writeln!(out, "Risk:          {level} ({review})");
    }
    if let Some(summary) = report
        .compliance_diff
        .as_ref()
        .and_then(|diff| diff.pointer("/compliance_diff/summary"))
        .and_then(Value::as_str)
    {
        let _ = writeln!(out, "Changes:       {summary}");
    }
    out.push('\n');
    out.push_str(&serde_json::to_string_pretty(&report.verdict).unwrap_or_else(|_| report.verdict.to_string()));
    out
}
