//! Response contract parsing.
//!
//! Model output is untrusted text. Each schema is decoded strictly; callers
//! pick the fallback that suits their call site:
//! - answering → `TriageDecision::fallback()`
//! - sender extraction → `SenderInfo::default()`
//! - classification → no result, which means "do not route"

use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use super::types::{Classification, DecisionSource, SenderInfo, TriageDecision};
use crate::error::ContractViolation;

/// Decode the first JSON object of type `T` from raw model output.
///
/// Prose or markdown fences around the object are ignored; the object itself
/// is decoded strictly.
fn decode<T: DeserializeOwned>(schema: &'static str, raw: &str) -> Result<T, ContractViolation> {
    let Some(start) = raw.find('{') else {
        return Err(ContractViolation {
            schema,
            reason: "no JSON object in output".to_string(),
        });
    };
    serde_json::Deserializer::from_str(&raw[start..])
        .into_iter::<T>()
        .next()
        .unwrap_or_else(|| Err(serde::de::Error::custom("empty JSON stream")))
        .map_err(|e| ContractViolation {
            schema,
            reason: e.to_string(),
        })
}

/// Strictly parse a triage decision.
pub fn parse_triage_decision(raw: &str) -> Result<TriageDecision, ContractViolation> {
    let decision: TriageDecision = decode("TriageDecision", raw)?;
    if decision.html_content.trim().is_empty() {
        return Err(ContractViolation {
            schema: "TriageDecision",
            reason: "html_content is empty".to_string(),
        });
    }
    Ok(decision)
}

/// Strictly parse a classification.
pub fn parse_classification(raw: &str) -> Result<Classification, ContractViolation> {
    let classification: Classification = decode("Classification", raw)?;
    if classification.classification_name.trim().is_empty() {
        return Err(ContractViolation {
            schema: "Classification",
            reason: "classification is empty".to_string(),
        });
    }
    Ok(classification)
}

/// Strictly parse sender details.
pub fn parse_sender_info(raw: &str) -> Result<SenderInfo, ContractViolation> {
    decode("SenderInfo", raw)
}

/// Parse a triage decision, substituting the fallback on violation.
pub fn decide(raw: &str) -> (TriageDecision, DecisionSource) {
    match parse_triage_decision(raw) {
        Ok(decision) => (decision, DecisionSource::Model),
        Err(e) => {
            error!(error = %e, "Answer service returned an invalid decision, using fallback");
            (TriageDecision::fallback(), DecisionSource::Fallback)
        }
    }
}

/// Parse a classification; `None` means the complaint must not be routed.
pub fn classify(raw: &str) -> Option<Classification> {
    match parse_classification(raw) {
        Ok(classification) => {
            info!(
                classification_id = classification.classification_id,
                classification = %classification.classification_name,
                "Successfully classified issue"
            );
            Some(classification)
        }
        Err(e) => {
            error!(error = %e, "LLM returned invalid JSON for issue classification");
            None
        }
    }
}

/// Parse sender details, substituting the generic salutation on violation.
pub fn sender_or_default(raw: &str) -> SenderInfo {
    match parse_sender_info(raw) {
        Ok(sender) => {
            info!(first_name = %sender.first_name, "Successfully extracted sender info");
            sender
        }
        Err(e) => {
            warn!(error = %e, "LLM returned invalid JSON for sender extraction");
            SenderInfo::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::types::Priority;

    // ── Triage decision ─────────────────────────────────────────────

    #[test]
    fn parse_valid_decision() {
        let raw = r#"{"html_content": "<p>Dear Sir/Ma</p>", "escalate": true}"#;
        let decision = parse_triage_decision(raw).unwrap();
        assert_eq!(decision.html_content, "<p>Dear Sir/Ma</p>");
        assert!(decision.escalate);
    }

    #[test]
    fn parse_decision_missing_escalate_fails() {
        let raw = r#"{"html_content": "<p>x</p>"}"#;
        assert!(parse_triage_decision(raw).is_err());
    }

    #[test]
    fn parse_decision_wrong_type_fails() {
        let raw = r#"{"html_content": "<p>x</p>", "escalate": "yes"}"#;
        let err = parse_triage_decision(raw).unwrap_err();
        assert_eq!(err.schema, "TriageDecision");
    }

    #[test]
    fn parse_decision_empty_html_fails() {
        let raw = r#"{"html_content": "  ", "escalate": false}"#;
        assert!(parse_triage_decision(raw).is_err());
    }

    #[test]
    fn decide_falls_back_on_garbage() {
        let (decision, source) = decide("I'm sorry, I can't help with that.");
        assert_eq!(source, DecisionSource::Fallback);
        assert_eq!(decision, TriageDecision::fallback());
    }

    #[test]
    fn decide_falls_back_on_sender_shaped_payload() {
        let (_, source) =
            decide(r#"{"first_name": "Sir/Ma", "last_name": "Sir/Ma", "email": null}"#);
        assert_eq!(source, DecisionSource::Fallback);
    }

    #[test]
    fn decide_accepts_markdown_wrapped_json() {
        let raw = "```json\n{\"html_content\": \"<p>ok</p>\", \"escalate\": false}\n```";
        let (decision, source) = decide(raw);
        assert_eq!(source, DecisionSource::Model);
        assert!(!decision.escalate);
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn parse_valid_classification() {
        let raw = r#"{"classification_id": 1, "classification": "RSA", "primary_issue": "payment delay", "suggested_priority": "high"}"#;
        let classification = parse_classification(raw).unwrap();
        assert_eq!(classification.classification_id, 1);
        assert_eq!(classification.classification_name, "RSA");
        assert_eq!(classification.primary_issue, "payment delay");
        assert_eq!(classification.suggested_priority, Priority::High);
    }

    #[test]
    fn classification_id_as_string_is_rejected() {
        let raw = r#"{"classification_id": "1", "classification": "RSA", "primary_issue": "x", "suggested_priority": "high"}"#;
        assert!(parse_classification(raw).is_err());
    }

    #[test]
    fn negative_classification_id_is_rejected() {
        let raw = r#"{"classification_id": -1, "classification": "RSA", "primary_issue": "x", "suggested_priority": "high"}"#;
        assert!(parse_classification(raw).is_err());
    }

    #[test]
    fn classify_returns_none_on_violation() {
        assert!(classify("{}").is_none());
        assert!(classify("not json").is_none());
    }

    // ── Sender extraction ───────────────────────────────────────────

    #[test]
    fn parse_sender_with_null_email() {
        let sender =
            sender_or_default(r#"{"first_name": "Ada", "last_name": "Obi", "email": null}"#);
        assert_eq!(sender.first_name, "Ada");
        assert!(sender.email.is_none());
    }

    #[test]
    fn sender_defaults_on_violation() {
        assert_eq!(sender_or_default("nope"), SenderInfo::default());
    }

    // ── JSON extraction ─────────────────────────────────────────────

    #[test]
    fn decision_followed_by_prose_keeps_model_answer() {
        let raw = "{\"html_content\": \"<p>ok</p>\", \"escalate\": false}\nLet me know if you need changes.";
        let (decision, source) = decide(raw);
        assert_eq!(source, DecisionSource::Model);
        assert!(!decision.escalate);
        assert_eq!(decision.html_content, "<p>ok</p>");
    }

    #[test]
    fn classification_with_braces_in_trailing_prose() {
        let raw = r#"Here is the JSON: {"classification_id": 3, "classification": "CS", "primary_issue": "x", "suggested_priority": "low"} (ids are {1,2,3})"#;
        let classification = classify(raw).unwrap();
        assert_eq!(classification.classification_id, 3);
    }

    #[test]
    fn braces_inside_string_values_are_kept() {
        let raw = r#"{"html_content": "<p>Ref {complaint_id}</p>", "escalate": true} trailing }"#;
        let decision = parse_triage_decision(raw).unwrap();
        assert_eq!(decision.html_content, "<p>Ref {complaint_id}</p>");
    }

    #[test]
    fn unterminated_object_is_violation() {
        let err = parse_triage_decision(r#"{"html_content": "<p>x</p>", "escalate": tr"#).unwrap_err();
        assert_eq!(err.schema, "TriageDecision");
    }

    #[test]
    fn output_without_object_is_violation() {
        let err = parse_classification("RSA, high priority").unwrap_err();
        assert!(err.reason.contains("no JSON object"));
    }
}
