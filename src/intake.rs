//! HTTP intake for complaints.
//!
//! `POST /api/complaints` validates the submission, hands it to the pipeline
//! on its own task and answers immediately. Pipeline outcomes are visible in
//! logs and, when a report channel is attached, as `TriageReport`s.

use std::sync::{Arc, LazyLock};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use regex::Regex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::triage::{Complaint, TriagePipeline, TriageReport};

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// Shared state for intake handlers.
#[derive(Clone)]
pub struct IntakeState {
    pub pipeline: Arc<TriagePipeline>,
    /// Receives every finished report, if set.
    pub reports: Option<mpsc::UnboundedSender<TriageReport>>,
}

/// Submitted complaint form.
#[derive(Debug, Deserialize)]
pub struct ComplaintSubmission {
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Build the intake router.
pub fn intake_routes(pipeline: Arc<TriagePipeline>) -> Router {
    routes(IntakeState {
        pipeline,
        reports: None,
    })
}

/// Build the intake router, forwarding finished reports to `reports`.
pub fn intake_routes_with_reports(
    pipeline: Arc<TriagePipeline>,
    reports: mpsc::UnboundedSender<TriageReport>,
) -> Router {
    routes(IntakeState {
        pipeline,
        reports: Some(reports),
    })
}

fn routes(state: IntakeState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/complaints", post(submit_complaint))
        .with_state(state)
}

/// All email addresses found in `text`, in order.
pub fn extract_emails(text: &str) -> Vec<&str> {
    EMAIL_ADDRESS.find_iter(text).map(|m| m.as_str()).collect()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "complaint-triage"
    }))
}

// ── Complaints ──────────────────────────────────────────────────────────

async fn submit_complaint(
    State(state): State<IntakeState>,
    Json(submission): Json<ComplaintSubmission>,
) -> impl IntoResponse {
    let complaint = match validate(submission) {
        Ok(complaint) => complaint,
        Err(message) => {
            warn!(reason = message, "Rejected complaint submission");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            );
        }
    };

    info!(sender = %complaint.sender_email, "Complaint accepted");
    let pipeline = state.pipeline.clone();
    let reports = state.reports.clone();
    tokio::spawn(async move {
        let report = pipeline.process(complaint).await;
        if let Some(tx) = reports
            && tx.send(report).is_err()
        {
            warn!("Report receiver dropped");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "sent" })),
    )
}

fn validate(submission: ComplaintSubmission) -> Result<Complaint, &'static str> {
    let subject = submission.subject.trim();
    let body = submission.body.trim();
    if submission.sender_email.trim().is_empty() {
        return Err("Please enter sender email address");
    }
    if subject.is_empty() {
        return Err("Please enter email subject");
    }
    if body.is_empty() {
        return Err("Please enter email body");
    }
    let Some(address) = extract_emails(&submission.sender_email).first().copied() else {
        return Err("Invalid email address");
    };
    Ok(Complaint {
        sender_email: address.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::error::DeliveryError;
    use crate::mail::{DeliveryReceipt, Mailer};
    use crate::triage::{
        AcknowledgementDispatcher, AnswerService, ClassifierService, PipelineDeps, RoutingTable,
        Router as UnitRouter,
    };

    struct NoEscalation;

    #[async_trait]
    impl AnswerService for NoEscalation {
        async fn ask(&self, _complaint_text: &str) -> String {
            r#"{"html_content": "<p>Ref {complaint_id}</p>", "escalate": false}"#.into()
        }
    }

    #[async_trait]
    impl ClassifierService for NoEscalation {
        async fn classify(&self, _complaint_text: &str) -> String {
            "{}".into()
        }
    }

    struct NullMailer;

    #[async_trait]
    impl Mailer for NullMailer {
        fn name(&self) -> &str {
            "null"
        }

        async fn send_email(
            &self,
            _to: &str,
            _subject: &str,
            _html_body: &str,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            Ok(DeliveryReceipt { status: 202 })
        }
    }

    fn pipeline() -> Arc<TriagePipeline> {
        let mailer: Arc<dyn Mailer> = Arc::new(NullMailer);
        Arc::new(TriagePipeline::new(PipelineDeps::new(
            Arc::new(NoEscalation),
            Arc::new(NoEscalation),
            AcknowledgementDispatcher::new(mailer.clone(), "PENCOM"),
            UnitRouter::new(Arc::new(RoutingTable::new()), mailer, "{unit_name}"),
        )))
    }

    fn post_json(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/complaints")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn extract_emails_finds_addresses() {
        assert_eq!(
            extract_emails("reach me at alice.o+tag@mail.example.com or bob@x.org"),
            vec!["alice.o+tag@mail.example.com", "bob@x.org"]
        );
        assert!(extract_emails("not-an-address@").is_empty());
        assert!(extract_emails("user@host").is_empty());
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = intake_routes(pipeline())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn valid_submission_is_accepted_and_processed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let response = intake_routes_with_reports(pipeline(), tx)
            .oneshot(post_json(serde_json::json!({
                "sender_email": " alice@example.com ",
                "subject": "Pension",
                "body": "My pension payment has not arrived",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(json_body(response).await["status"], "sent");

        let report = rx.recv().await.unwrap();
        assert!(report.is_complete());
        assert!(report.acknowledgement.is_success());
    }

    #[tokio::test]
    async fn empty_fields_are_rejected() {
        let response = intake_routes(pipeline())
            .oneshot(post_json(serde_json::json!({
                "sender_email": "alice@example.com",
                "subject": "  ",
                "body": "text",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Please enter email subject");
    }

    #[test]
    fn each_missing_field_has_its_own_message() {
        let submission = |sender: &str, subject: &str, body: &str| ComplaintSubmission {
            sender_email: sender.into(),
            subject: subject.into(),
            body: body.into(),
        };
        assert_eq!(
            validate(submission("", "s", "b")).unwrap_err(),
            "Please enter sender email address"
        );
        assert_eq!(
            validate(submission("a@example.com", "", "b")).unwrap_err(),
            "Please enter email subject"
        );
        assert_eq!(
            validate(submission("a@example.com", "s", " ")).unwrap_err(),
            "Please enter email body"
        );
        assert!(validate(submission("a@example.com", "s", "b")).is_ok());
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let response = intake_routes_with_reports(pipeline(), tx)
            .oneshot(post_json(serde_json::json!({
                "sender_email": "alice at example dot com",
                "subject": "Pension",
                "body": "text",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid email address");
        assert!(rx.try_recv().is_err());
    }
}
