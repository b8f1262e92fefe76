//! Complaint triage pipeline.
//!
//! Every complaint flows through:
//! 1. `identifier::generate()`: fresh tracking ID
//! 2. `AnswerService::ask()`: drafted acknowledgement + escalation flag
//! 3. `contract::decide()`: strict decoding, fallback on violation
//! 4. `AcknowledgementDispatcher::send()`: reply to the complainant
//! 5. `ClassifierService::classify()` + `Router::route()`: escalation only
//!
//! `coordinator::TriagePipeline` sequences the stages and reports the outcome.

pub mod acknowledge;
pub mod contract;
pub mod coordinator;
pub mod identifier;
pub mod inference;
pub mod router;
pub mod types;

pub use acknowledge::AcknowledgementDispatcher;
pub use coordinator::{PipelineDeps, TriagePipeline};
pub use inference::{
    AnswerService, ClassifierService, LlmAnswerService, LlmClassifier, LlmSenderExtractor,
    SenderExtractor,
};
pub use router::{CLASSIFICATION_UNITS, Router, RoutingTable};
pub use types::{
    Classification, Complaint, ComplaintId, PipelineState, StageOutcome, TriageDecision,
    TriageReport,
};
