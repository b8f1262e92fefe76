//! Acknowledgement dispatch to the complainant.

use std::sync::Arc;

use tracing::{error, info};

use super::types::{ComplaintId, SenderInfo};
use crate::error::{AcknowledgementError, TemplateError};
use crate::mail::{DeliveryReceipt, Mailer};
use crate::templates::{extract_html_body, format_placeholders};

/// An acknowledgement that reached the email provider.
#[derive(Debug, Clone)]
pub struct SentAcknowledgement {
    pub html: String,
    pub receipt: DeliveryReceipt,
}

/// Renders the drafted acknowledgement and mails it back to the complainant.
pub struct AcknowledgementDispatcher {
    mailer: Arc<dyn Mailer>,
    company_name: String,
}

impl AcknowledgementDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, company_name: impl Into<String>) -> Self {
        Self {
            mailer,
            company_name: company_name.into(),
        }
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Isolate the body fragment and fill `complaint_id`, `company_name`
    /// and `first_name`.
    pub fn render(
        &self,
        decision_html: &str,
        complaint_id: &ComplaintId,
        sender: &SenderInfo,
    ) -> Result<String, TemplateError> {
        let fragment = extract_html_body(decision_html);
        format_placeholders(
            &fragment,
            &[
                ("complaint_id", complaint_id.as_str()),
                ("company_name", &self.company_name),
                ("first_name", &sender.first_name),
            ],
        )
        .inspect_err(|e| error!(complaint_id = %complaint_id, error = %e, "Missing placeholder in LLM HTML"))
    }

    /// Render and send the acknowledgement.
    pub async fn send(
        &self,
        recipient: &str,
        subject: &str,
        decision_html: &str,
        complaint_id: &ComplaintId,
        sender: &SenderInfo,
    ) -> Result<SentAcknowledgement, AcknowledgementError> {
        info!(
            complaint_id = %complaint_id,
            recipient = %recipient,
            "Sending acknowledgement response"
        );

        let html = self.render(decision_html, complaint_id, sender)?;
        let subject = reply_subject(subject);

        match self.mailer.send_email(recipient, &subject, &html).await {
            Ok(receipt) => {
                info!(complaint_id = %complaint_id, recipient = %recipient, "Successfully sent acknowledgement");
                Ok(SentAcknowledgement { html, receipt })
            }
            Err(e) => {
                error!(
                    complaint_id = %complaint_id,
                    recipient = %recipient,
                    error = %e,
                    "Error sending acknowledgement email"
                );
                Err(e.into())
            }
        }
    }
}

/// Subject line for a reply.
pub fn reply_subject(subject: &str) -> String {
    format!("Re: {subject}")
}
