//! Shared types for the complaint triage pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identifier ──────────────────────────────────────────────────────

/// Opaque tracking identifier, unique per pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplaintId(String);

impl ComplaintId {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Inbound complaint ───────────────────────────────────────────────

/// A complaint as submitted by the complainant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    /// Where the acknowledgement is sent.
    pub sender_email: String,
    pub subject: String,
    pub body: String,
}

// ── Model decisions ─────────────────────────────────────────────────

/// Outcome of the answering step: acknowledgement draft plus escalation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageDecision {
    pub html_content: String,
    pub escalate: bool,
}

/// Salutation used whenever the complainant's name is unknown.
pub const DEFAULT_SALUTATION: &str = "Sir/Ma";

/// Acknowledgement sent when the answering step produced nothing usable.
pub const FALLBACK_ACKNOWLEDGEMENT_HTML: &str = "<p>Dear {first_name},</p>\
<p>Thank you for contacting {company_name}. Your complaint has been received and logged \
with reference <strong>{complaint_id}</strong>.</p>\
<p>Our team will review it and get back to you shortly.</p>";

impl TriageDecision {
    /// Decision used when the model output cannot be trusted.
    ///
    /// Escalates, so a complaint is never closed on the strength of an
    /// answer nobody could read.
    pub fn fallback() -> Self {
        Self {
            html_content: FALLBACK_ACKNOWLEDGEMENT_HTML.to_string(),
            escalate: true,
        }
    }
}

/// Where a `TriageDecision` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Model,
    Fallback,
}

/// Suggested handling priority from the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
    /// Any label the classifier emits outside the known set.
    Other(String),
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" | "normal" => Self::Medium,
            "high" => Self::High,
            "critical" | "urgent" => Self::Critical,
            _ => Self::Other(value),
        }
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
            Self::Critical => f.write_str("critical"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// Outcome of the classification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub classification_id: u32,
    #[serde(rename = "classification")]
    pub classification_name: String,
    pub primary_issue: String,
    pub suggested_priority: Priority,
}

/// Complainant details recovered from the complaint text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl Default for SenderInfo {
    fn default() -> Self {
        Self {
            first_name: DEFAULT_SALUTATION.to_string(),
            last_name: DEFAULT_SALUTATION.to_string(),
            email: None,
        }
    }
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Progress of one pipeline run. States are never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Created,
    Answered,
    Acknowledged,
    Escalating,
    Classified,
    Routed,
    Done,
}

impl PipelineState {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Answered => "answered",
            Self::Acknowledged => "acknowledged",
            Self::Escalating => "escalating",
            Self::Classified => "classified",
            Self::Routed => "routed",
            Self::Done => "done",
        }
    }
}

/// Result of a single dispatch stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Succeeded,
    Failed { reason: String },
    Skipped,
}

impl StageOutcome {
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Everything a pipeline run did, for operators and callers.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub complaint_id: ComplaintId,
    pub state: PipelineState,
    pub decision: TriageDecision,
    pub decision_source: DecisionSource,
    pub acknowledgement: StageOutcome,
    pub classification: Option<Classification>,
    pub routing: StageOutcome,
}

impl TriageReport {
    /// True once the run reached `Done`.
    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Done
    }
}
