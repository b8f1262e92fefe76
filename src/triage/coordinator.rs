//! Pipeline coordinator. Sequences one complaint through every stage.
//!
//! Flow:
//! 1. Generate identifier (`Created`)
//! 2. Answer service → strict decision, fallback on violation (`Answered`)
//! 3. Acknowledge complainant, failure logged only (`Acknowledged`)
//! 4. If escalating: classify (`Escalating` → `Classified`) then route (`Routed`)
//! 5. `Done`
//!
//! Stage failures are caught at the stage boundary and land in the
//! `TriageReport`; `process` itself never fails.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::acknowledge::AcknowledgementDispatcher;
use super::contract;
use super::identifier;
use super::inference::{AnswerService, ClassifierService, SenderExtractor};
use super::router::Router;
use super::types::{
    Complaint, ComplaintId, PipelineState, SenderInfo, StageOutcome, TriageReport,
};
use crate::store::{ComplaintStore, NoopStore};

/// Collaborators injected into the pipeline.
pub struct PipelineDeps {
    pub answer: Arc<dyn AnswerService>,
    pub classifier: Arc<dyn ClassifierService>,
    /// Sender extraction is optional; without it the salutation is generic.
    pub sender_extractor: Option<Arc<dyn SenderExtractor>>,
    pub acknowledger: AcknowledgementDispatcher,
    pub router: Router,
    pub store: Arc<dyn ComplaintStore>,
}

impl PipelineDeps {
    /// Dependencies with no sender extraction and no store.
    pub fn new(
        answer: Arc<dyn AnswerService>,
        classifier: Arc<dyn ClassifierService>,
        acknowledger: AcknowledgementDispatcher,
        router: Router,
    ) -> Self {
        Self {
            answer,
            classifier,
            sender_extractor: None,
            acknowledger,
            router,
            store: Arc::new(NoopStore),
        }
    }

    pub fn with_sender_extractor(mut self, extractor: Arc<dyn SenderExtractor>) -> Self {
        self.sender_extractor = Some(extractor);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ComplaintStore>) -> Self {
        self.store = store;
        self
    }
}

/// Runs complaints through triage. Shareable across concurrent runs.
pub struct TriagePipeline {
    deps: PipelineDeps,
}

impl TriagePipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    /// Process one complaint end to end.
    pub async fn process(&self, complaint: Complaint) -> TriageReport {
        let complaint_id = identifier::generate();
        info!(
            complaint_id = %complaint_id,
            sender = %complaint.sender_email,
            "Processing complaint"
        );
        self.register(&complaint_id, &complaint).await;

        let sender = self.extract_sender(&complaint.body).await;

        // Created → Answered
        let raw = self.deps.answer.ask(&complaint.body).await;
        let (decision, decision_source) = contract::decide(&raw);

        // Answered → Acknowledged
        let acknowledgement = match self
            .deps
            .acknowledger
            .send(
                &complaint.sender_email,
                &complaint.subject,
                &decision.html_content,
                &complaint_id,
                &sender,
            )
            .await
        {
            Ok(sent) => {
                self.record(&complaint_id, "acknowledgement_html", &sent.html)
                    .await;
                StageOutcome::Succeeded
            }
            Err(e) => StageOutcome::failed(e),
        };
        info!(
            complaint_id = %complaint_id,
            escalate = decision.escalate,
            "Customer complaint escalation status"
        );

        let mut report = TriageReport {
            complaint_id,
            state: PipelineState::Acknowledged,
            decision,
            decision_source,
            acknowledgement,
            classification: None,
            routing: StageOutcome::Skipped,
        };

        if !report.decision.escalate {
            report.state = PipelineState::Done;
            self.finish(&report);
            return report;
        }

        // Acknowledged → Escalating → Classified
        report.state = PipelineState::Escalating;
        let raw = self.deps.classifier.classify(&complaint.body).await;
        let Some(classification) = contract::classify(&raw) else {
            warn!(
                complaint_id = %report.complaint_id,
                "No classification, complaint will not be routed"
            );
            self.finish(&report);
            return report;
        };
        report.state = PipelineState::Classified;

        // Classified → Routed → Done
        match self
            .deps
            .router
            .route(&classification, &report.complaint_id, &complaint.body)
            .await
        {
            Ok(_) => {
                self.record(
                    &report.complaint_id,
                    "assigned_unit",
                    &classification.classification_name,
                )
                .await;
                report.routing = StageOutcome::Succeeded;
                report.state = PipelineState::Done;
            }
            Err(e) => {
                report.routing = StageOutcome::failed(e);
            }
        }
        report.classification = Some(classification);

        self.finish(&report);
        report
    }

    async fn extract_sender(&self, complaint_text: &str) -> SenderInfo {
        match &self.deps.sender_extractor {
            Some(extractor) => contract::sender_or_default(&extractor.extract(complaint_text).await),
            None => SenderInfo::default(),
        }
    }

    async fn register(&self, complaint_id: &ComplaintId, complaint: &Complaint) {
        if let Err(e) = self.deps.store.register(complaint_id).await {
            error!(complaint_id = %complaint_id, error = %e, "Failed to register complaint");
            return;
        }
        self.record(complaint_id, "complaint_email", &complaint.sender_email)
            .await;
        self.record(complaint_id, "complaint_subject", &complaint.subject)
            .await;
        self.record(complaint_id, "complaint_body", &complaint.body)
            .await;
    }

    async fn record(&self, complaint_id: &ComplaintId, key: &str, value: &str) {
        if let Err(e) = self.deps.store.put(complaint_id, key, value).await {
            error!(complaint_id = %complaint_id, key, error = %e, "Failed to store complaint data");
        }
    }

    fn finish(&self, report: &TriageReport) {
        if report.is_complete() {
            info!(complaint_id = %report.complaint_id, "Completed processing complaint");
        } else {
            warn!(
                complaint_id = %report.complaint_id,
                state = report.state.label(),
                "Complaint processing ended incomplete"
            );
        }
    }
}
