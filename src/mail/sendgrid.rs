//! SendGrid v3 mail-send backend.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{error, info};

use super::{DeliveryReceipt, Mailer};
use crate::error::DeliveryError;

/// Default SendGrid endpoint.
pub const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid connection settings.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: SecretString,
    pub api_url: String,
    pub from_address: String,
    pub timeout: Duration,
}

/// Mailer backed by the SendGrid HTTP API.
pub struct SendGridMailer {
    client: reqwest::Client,
    config: SendGridConfig,
}

impl SendGridMailer {
    pub fn new(config: SendGridConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Transport {
                provider: "sendgrid".into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    subject: &'a str,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

fn build_payload<'a>(
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
) -> MailSendRequest<'a> {
    MailSendRequest {
        personalizations: vec![Personalization {
            to: vec![Address { email: to }],
            subject,
        }],
        from: Address { email: from },
        content: vec![Content {
            kind: "text/html",
            value: html_body,
        }],
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        info!(recipient = %to, subject = %subject, "Sending email");

        let payload = build_payload(&self.config.from_address, to, subject, html_body);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        provider: "sendgrid".into(),
                        timeout: self.config.timeout,
                    }
                } else {
                    DeliveryError::Transport {
                        provider: "sendgrid".into(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        info!(status = status.as_u16(), "SendGrid API response status");
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "SendGrid API error");
            return Err(DeliveryError::Rejected {
                provider: "sendgrid".into(),
                status: status.as_u16(),
                body,
            });
        }

        info!(recipient = %to, "Email sent");
        Ok(DeliveryReceipt {
            status: status.as_u16(),
        })
    }
}
