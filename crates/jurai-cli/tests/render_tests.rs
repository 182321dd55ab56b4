use jurai_cli::{load_context, render_event, render_report};
use jurai_core::{AgentRole, ComplianceReport, EventKind, ProgressEvent};

#[test]
fn test_thinking_events_render_with_speaker() {
    let milestone = ProgressEvent::milestone(EventKind::CriticThinking, "Critic_Reviewer is checking iteration 1...");
    assert_eq!(
        render_event(&milestone).unwrap(),
        "[critic] Critic_Reviewer is checking iteration 1..."
    );

    let log = ProgressEvent::log_line(EventKind::JuryThinking, "GDPR Art. 8 applies.");
    assert_eq!(render_event(&log).unwrap(), "    GDPR Art. 8 applies.");
}

#[test]
fn test_report_and_critique_render_as_sections() {
    let report = render_event(&ProgressEvent::report("  {\"feature\": \"x\"}\n")).unwrap();
    assert_eq!(report, "── Jury report ──\n{\"feature\": \"x\"}");

    let critique = render_event(&ProgressEvent::critique("No major issues found.")).unwrap();
    assert!(critique.starts_with("── Critique ──"));
    assert!(render_event(&ProgressEvent::verdict("{}")).unwrap().contains("verdict ready"));
}

#[test]
fn test_report_summary() {
    let report: ComplianceReport = serde_json::from_value(serde_json::json!({
        "feature_id": "chat-translation",
        "run_id": "run_20250830T140509Z_a1b2c3",
        "timestamp": "2025-08-30T14:05:09Z",
        "verdict": {"needs_geo_specific_logic": true},
        "previous_verdict": null,
        "metadata": {
            "verdict_version": "003",
            "previous_verdict_exists": true,
            "jurisdictions_evaluated": ["EU", "US-CA"],
            "models_used": {"judge": "groq/llama-3.1-8b-instant"},
            "converged": false
        },
        "agent_trace": []
    }))
    .unwrap();
    assert_eq!(report.metadata.models_used[&AgentRole::Judge], "groq/llama-3.1-8b-instant");
    assert!(report.agent_trace.is_empty());

    let text = render_report(&report);
    assert!(text.contains("Feature:       chat-translation"));
    assert!(text.contains("003 (supersedes a previous verdict)"));
    assert!(text.contains("Jurisdictions: EU, US-CA"));
    assert!(text.contains("iteration budget exhausted"));
    assert!(text.contains("Steps:         0"));
    assert!(text.contains("\"needs_geo_specific_logic\": true"));
    assert!(!text.contains("Risk:"));
    assert!(!text.contains("Changes:"));
}

#[test]
fn test_report_summary_with_analysis() {
    let report: ComplianceReport = serde_json::from_value(serde_json::json!({
        "feature_id": "age-gate",
        "run_id": "run_20250830T140509Z_a1b2c3",
        "timestamp": "2025-08-30T14:05:09Z",
        "verdict": {},
        "previous_verdict": null,
        "compliance_diff": {"compliance_diff": {"summary": "COPPA now applies"}},
        "risk": {
            "risk_assessment": {"overall_risk": "High", "risk_score": 70},
            "governance": {
                "human_review_required": true,
                "review_status": "Pending",
                "reviewed_by": null,
                "review_reason": null,
                "audit_id": null
            }
        },
        "metadata": {
            "verdict_version": "002",
            "previous_verdict_exists": true,
            "jurisdictions_evaluated": [],
            "models_used": {},
            "converged": true
        },
        "agent_trace": []
    }))
    .unwrap();

    let text = render_report(&report);
    assert!(text.contains("Risk:          High (human review required)"));
    assert!(text.contains("Changes:       COPPA now applies"));
}

#[test]
fn test_load_context_takes_first_list_element() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ctx.json");

    std::fs::write(&path, r#"[{"feature": "Chat Translation"}, {"feature": "Other"}]"#).unwrap();
    assert_eq!(load_context(&path).unwrap()["feature"], "Chat Translation");

    std::fs::write(&path, r#"{"feature": "Age Gate", "region": "EU"}"#).unwrap();
    assert_eq!(load_context(&path).unwrap()["region"], "EU");

    std::fs::write(&path, "[]").unwrap();
    assert!(load_context(&path).is_err());
    std::fs::write(&path, "\"just a string\"").unwrap();
    assert!(load_context(&path).is_err());
}
